use crate::api::handlers::{auth, health, roles};
use crate::types::{
    AuthResponse, ChangeRoleRequest, LoginAttemptResponse, LoginRequest, MeResponse,
    PermissionResponse, RegisterRequest, RolePermissionsResponse, RoleResponse, TokenResponse,
    UserResponse,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "KitchAI",
        description = "Staff accounts, login with lockout, and role-based permissions"
    ),
    paths(
        auth::register,
        auth::login,
        auth::refresh_token,
        auth::me,
        auth::login_attempts,
        roles::list_roles,
        roles::role_permissions,
        roles::list_permissions,
        roles::change_user_role,
        health::health,
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        ChangeRoleRequest,
        UserResponse,
        AuthResponse,
        TokenResponse,
        MeResponse,
        RoleResponse,
        PermissionResponse,
        RolePermissionsResponse,
        LoginAttemptResponse,
        health::HealthResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Registration, login and sessions"),
        (name = "roles", description = "Roles, permissions and role assignment"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
