use crate::{
    auth::middleware::{bearer_token, AuthUser, ClientAddress},
    db::{with_timeout, AccountStore, AttemptLedger},
    types::{
        AppError, AuthResponse, LoginAttemptResponse, LoginRequest, MeResponse, RegisterRequest,
        Result, TokenResponse, UserResponse,
    },
    AppState,
};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

const DEFAULT_ATTEMPTS_LIMIT: u32 = 50;
const MAX_ATTEMPTS_LIMIT: u32 = 500;

/// Register a new staff account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account registered", body = UserResponse),
        (status = 400, description = "Invalid input, email already registered or unknown role")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let account = state.accounts.register(payload).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&account))))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials, with remaining attempts when known"),
        (status = 429, description = "Account locked, with minutes remaining"),
        (status = 503, description = "Store unavailable, retry later")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ClientAddress(client_address): ClientAddress,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let account = state
        .auth_engine
        .authenticate(&payload.email, &payload.password, client_address)
        .await?
        .into_result()?;

    let access_token = state.token_service.issue(
        &account.id,
        &account.email,
        &account.role_id,
        state.config.auth.token_ttl_minutes,
    )?;

    Ok(Json(AuthResponse {
        access_token,
        token_type: "bearer".to_string(),
        user: UserResponse::from(&account),
    }))
}

/// Exchange a still-valid token for a fresh one
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "Token refreshed", body = TokenResponse),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    let ttl = state.config.auth.token_ttl_minutes;
    let access_token = state
        .token_service
        .refresh(token, ttl)?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: ttl * 60,
    }))
}

/// Current account with its role's permissions
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current account", body = MeResponse),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 404, description = "Account no longer exists")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<MeResponse>> {
    let timeout = state.config.auth.store_timeout();
    let account = with_timeout(timeout, "find_by_id", state.db.find_by_id(&claims.sub))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", claims.sub)))?;

    let role = state
        .authorization
        .role(&account.role_id)
        .await?
        .map(|r| r.name.to_string())
        .unwrap_or_default();
    let permissions = state
        .authorization
        .permissions_for_role(&account.role_id)
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();

    Ok(Json(MeResponse {
        user: UserResponse::from(&account),
        role,
        permissions,
    }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AttemptsQuery {
    /// Email to audit (case-insensitive)
    pub email: String,
    /// Maximum rows, newest first (default 50, max 500)
    pub limit: Option<u32>,
}

/// Login attempt history for an email
#[utoipa::path(
    get,
    path = "/api/auth/attempts",
    params(AttemptsQuery),
    responses(
        (status = 200, description = "Attempts, newest first", body = [LoginAttemptResponse]),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 403, description = "Caller lacks the manage-users permission")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn login_attempts(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(query): Query<AttemptsQuery>,
) -> Result<Json<Vec<LoginAttemptResponse>>> {
    state
        .authorization
        .require_permission(&claims.role_id, "manage-users")
        .await?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_ATTEMPTS_LIMIT)
        .clamp(1, MAX_ATTEMPTS_LIMIT);
    let attempts = with_timeout(
        state.config.auth.store_timeout(),
        "attempts_for_email",
        state.db.attempts_for_email(&query.email, limit),
    )
    .await?;

    Ok(Json(attempts.iter().map(LoginAttemptResponse::from).collect()))
}
