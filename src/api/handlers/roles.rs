use crate::{
    types::{
        AppError, ChangeRoleRequest, PermissionResponse, Result, RolePermissionsResponse,
        RoleResponse, UserResponse,
    },
    AppState,
};
use axum::{
    extract::{Path, State},
    Json,
};

/// List all roles
#[utoipa::path(
    get,
    path = "/api/roles/",
    responses((status = 200, description = "Roles ordered by name", body = [RoleResponse])),
    tag = "roles"
)]
pub async fn list_roles(State(state): State<AppState>) -> Result<Json<Vec<RoleResponse>>> {
    let roles = state.authorization.list_roles().await?;
    Ok(Json(roles.iter().map(RoleResponse::from).collect()))
}

/// Permissions granted to a role
#[utoipa::path(
    get,
    path = "/api/roles/{role_id}/permissions",
    params(("role_id" = String, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role with its permissions", body = RolePermissionsResponse),
        (status = 404, description = "Role not found")
    ),
    tag = "roles"
)]
pub async fn role_permissions(
    State(state): State<AppState>,
    Path(role_id): Path<String>,
) -> Result<Json<RolePermissionsResponse>> {
    let role = state
        .authorization
        .role(&role_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Role '{}' does not exist", role_id)))?;

    let permissions = state.authorization.permissions_for_role(&role.id).await?;

    Ok(Json(RolePermissionsResponse {
        id: role.id,
        name: role.name.to_string(),
        description: role.description,
        permissions: permissions.iter().map(PermissionResponse::from).collect(),
    }))
}

/// List all permissions
#[utoipa::path(
    get,
    path = "/api/roles/permissions/",
    responses((status = 200, description = "Permissions ordered by name", body = [PermissionResponse])),
    tag = "roles"
)]
pub async fn list_permissions(
    State(state): State<AppState>,
) -> Result<Json<Vec<PermissionResponse>>> {
    let permissions = state.authorization.list_permissions().await?;
    Ok(Json(permissions.iter().map(PermissionResponse::from).collect()))
}

/// Assign a new role to an account
#[utoipa::path(
    put,
    path = "/api/roles/users/{user_id}/role",
    params(("user_id" = String, Path, description = "Account id")),
    request_body = ChangeRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserResponse),
        (status = 400, description = "Unknown role"),
        (status = 404, description = "Account not found")
    ),
    tag = "roles"
)]
pub async fn change_user_role(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<ChangeRoleRequest>,
) -> Result<Json<UserResponse>> {
    let account = state.accounts.change_role(&user_id, &payload.role).await?;
    Ok(Json(UserResponse::from(&account)))
}
