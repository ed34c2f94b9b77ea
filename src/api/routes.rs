use crate::api::handlers::{auth, roles};
use crate::auth::jwt::TokenService;
use crate::AppState;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

/// Routes mounted under `/api`.
pub fn create_router(token_service: Arc<TokenService>) -> Router<AppState> {
    let public_routes = Router::new()
        // Public routes (no auth required)
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh_token))
        .route("/roles/", get(roles::list_roles))
        .route("/roles/permissions/", get(roles::list_permissions))
        .route("/roles/{role_id}/permissions", get(roles::role_permissions))
        .route("/roles/users/{user_id}/role", put(roles::change_user_role))
        .route("/health", get(crate::api::handlers::health::health));

    let protected_routes = Router::new()
        // Protected routes (bearer token required)
        .route("/auth/me", get(auth::me))
        .route("/auth/attempts", get(auth::login_attempts))
        .layer(middleware::from_fn_with_state(
            token_service,
            crate::auth::middleware::auth_middleware,
        ));

    public_routes.merge(protected_routes)
}
