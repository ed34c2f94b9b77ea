use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::users::{Account, LoginAttempt, Permission, Role};

// ============= API Request/Response Types =============

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub password: String,
    /// One of `admin`, `employee`, `waiter` (case-insensitive). Defaults to `waiter`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangeRoleRequest {
    pub role: String,
}

/// Public view of an account. Never carries the password hash or lockout state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for UserResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            role_id: account.role_id.clone(),
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub user: UserResponse,
    pub role: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Role> for RoleResponse {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id.clone(),
            name: role.name.as_str().to_string(),
            description: role.description.clone(),
            created_at: role.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermissionResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Permission> for PermissionResponse {
    fn from(permission: &Permission) -> Self {
        Self {
            id: permission.id.clone(),
            name: permission.name.clone(),
            description: permission.description.clone(),
            created_at: permission.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RolePermissionsResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<PermissionResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginAttemptResponse {
    pub id: String,
    pub email: String,
    pub success: bool,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&LoginAttempt> for LoginAttemptResponse {
    fn from(attempt: &LoginAttempt) -> Self {
        Self {
            id: attempt.id.clone(),
            email: attempt.email.clone(),
            success: attempt.success,
            ip_address: attempt.ip_address.clone(),
            created_at: attempt.created_at,
        }
    }
}

// ============= Token Claims =============

/// JWT payload. Validity is proven by signature and `exp` alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role_id: String,
    pub iat: i64,
    pub exp: i64,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{message}")]
    InvalidCredentials {
        message: String,
        attempts_remaining: Option<u32>,
    },

    #[error("{message}")]
    AccountLocked {
        message: String,
        minutes_remaining: i64,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::{header, StatusCode};

        let mut retry_after = None;
        let (status, body) = match self {
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "database failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "Internal server error" }),
                )
            }
            AppError::StoreUnavailable(msg) => {
                tracing::warn!(error = %msg, "store unavailable");
                retry_after = Some(1);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    serde_json::json!({ "error": "Service temporarily unavailable" }),
                )
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            AppError::InvalidCredentials {
                message,
                attempts_remaining,
            } => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({
                    "error": message,
                    "attempts_remaining": attempts_remaining,
                }),
            ),
            AppError::AccountLocked {
                message,
                minutes_remaining,
            } => {
                retry_after = Some(minutes_remaining * 60);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    serde_json::json!({
                        "error": message,
                        "retry_after_minutes": minutes_remaining,
                    }),
                )
            }
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, serde_json::json!({ "error": msg }))
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, serde_json::json!({ "error": msg })),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "Internal server error" }),
                )
            }
        };

        let mut response = (status, axum::Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = header::HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
