use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub version: String,
}

/// Liveness check
pub async fn liveness() -> &'static str {
    "OK"
}

/// Service and database health
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = crate::db::with_timeout(
        state.config.auth.store_timeout(),
        "ping",
        state.db.ping(),
    )
    .await;

    let (status, label, database) = match database {
        Ok(()) => (StatusCode::OK, "ok", "connected".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable".to_string())
        }
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            database,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
