//! # KitchAI
//!
//! Restaurant management backend: staff account registration, login with
//! brute-force protection, stateless JWT sessions, and role/permission
//! authorization.
//!
//! ## Overview
//!
//! KitchAI can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `kitchai-server` binary
//! 2. **As a library** - Embed the login core in another service
//!
//! ### Library Example
//!
//! ```rust,ignore
//! use kitchai::auth::{AuthEngine, CredentialHasher};
//! use kitchai::db::TursoClient;
//! use kitchai::users::LockoutPolicy;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let db = Arc::new(TursoClient::new_local("./data/kitchai.db").await?);
//! let engine = AuthEngine::new(
//!     db.clone(),
//!     db.clone(),
//!     CredentialHasher::new(),
//!     LockoutPolicy::default(),
//!     Duration::from_secs(5),
//! );
//!
//! let account = engine
//!     .authenticate("ana@x.com", "Secure123!", None)
//!     .await?
//!     .into_result()?;
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `turso` | Remote Turso database |
//! | `swagger-ui` | Interactive API docs at `/swagger-ui/` |
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`auth`] - Login engine, hashing, tokens, authorization and middleware
//! - [`cli`] - Command-line interface
//! - [`db`] - Store traits and the libSQL implementation
//! - [`types`] - Request/response types and error handling
//! - [`users`] - Accounts, roles, permissions and registration rules
//! - [`utils`] - TOML configuration

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Authentication, authorization and middleware.
pub mod auth;
/// Command-line interface.
pub mod cli;
/// Store traits and the libSQL client.
pub mod db;
/// Core types (requests, responses, errors).
pub mod types;
/// Accounts, roles, permissions and the login audit record.
pub mod users;
/// Configuration utilities (TOML).
pub mod utils;

// Re-export commonly used types
pub use db::TursoClient;
pub use types::{AppError, Result};
pub use utils::toml_config::KitchaiConfig;

use crate::auth::{AuthEngine, AuthorizationResolver, CredentialHasher, TokenService};
use crate::users::AccountService;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML-based configuration
    pub config: Arc<KitchaiConfig>,
    /// Database client
    pub db: Arc<TursoClient>,
    /// Login decisions and lockout
    pub auth_engine: AuthEngine,
    /// Registration and role changes
    pub accounts: Arc<AccountService>,
    /// Role to permission resolution
    pub authorization: Arc<AuthorizationResolver>,
    /// Token issuance and verification
    pub token_service: Arc<TokenService>,
}

impl AppState {
    /// Wire the services over one database client.
    pub fn new(
        config: KitchaiConfig,
        db: Arc<TursoClient>,
        hasher: CredentialHasher,
        jwt_secret: &str,
    ) -> Result<Self> {
        let algorithm = config
            .auth
            .algorithm()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let token_service = Arc::new(TokenService::new(jwt_secret, algorithm)?);
        let timeout = config.auth.store_timeout();

        let auth_engine = AuthEngine::new(
            db.clone(),
            db.clone(),
            hasher.clone(),
            config.auth.lockout_policy(),
            timeout,
        );
        let accounts = Arc::new(AccountService::new(db.clone(), db.clone(), hasher, timeout));
        let authorization = Arc::new(AuthorizationResolver::new(db.clone(), timeout));

        Ok(Self {
            config: Arc::new(config),
            db,
            auth_engine,
            accounts,
            authorization,
            token_service,
        })
    }
}

/// The full HTTP application: `/health`, the OpenAPI document and `/api/*`.
pub fn build_app(state: AppState) -> Router {
    let api = api::routes::create_router(state.token_service.clone());

    let router = Router::new()
        .route("/health", get(api::handlers::health::liveness))
        .nest("/api", api);

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::openapi::ApiDoc::openapi()),
        )
    };
    #[cfg(not(feature = "swagger-ui"))]
    let router = router.route("/api-docs/openapi.json", get(openapi_json));

    router
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[cfg(not(feature = "swagger-ui"))]
async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi;
    axum::Json(api::openapi::ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    async fn app() -> Router {
        let db = Arc::new(TursoClient::new_memory().await.unwrap());
        let state = AppState::new(
            KitchaiConfig::default(),
            db,
            CredentialHasher::with_params(1024, 1, 1).unwrap(),
            "unit-test-secret-0123456789abcdef",
        )
        .unwrap();
        build_app(state)
    }

    #[tokio::test]
    async fn responses_carry_cors_headers() {
        let response = app()
            .await
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "http://pos.local")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let body = vec![b'a'; MAX_BODY_BYTES + 1];
        let response = app()
            .await
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, body.len())
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
