//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use axum_test::TestServer;
use kitchai::{auth::CredentialHasher, build_app, db::TursoClient, AppState, KitchaiConfig};
use serde_json::json;
use std::sync::Arc;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const STRONG_PASSWORD: &str = "Secure123!";

/// Cheap Argon2 parameters; production defaults are far too slow for a test loop.
pub fn fast_hasher() -> CredentialHasher {
    CredentialHasher::with_params(1024, 1, 1).expect("valid argon2 params")
}

/// In-memory database with roles and the default permission catalogue.
pub async fn create_test_db() -> Arc<TursoClient> {
    let db = TursoClient::new_memory()
        .await
        .expect("Failed to create in-memory database");
    db.seed_default_permissions()
        .await
        .expect("Failed to seed permissions");
    Arc::new(db)
}

pub async fn create_test_state() -> AppState {
    let db = create_test_db().await;
    AppState::new(KitchaiConfig::default(), db, fast_hasher(), TEST_SECRET)
        .expect("Failed to build app state")
}

/// Full router over a fresh in-memory database.
pub async fn create_test_server() -> (TestServer, AppState) {
    let state = create_test_state().await;
    let server = TestServer::new(build_app(state.clone())).expect("Failed to create test server");
    (server, state)
}

/// Registers an account and returns its id.
pub async fn register(server: &TestServer, name: &str, email: &str, role: &str) -> String {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "name": name,
            "email": email,
            "password": STRONG_PASSWORD,
            "role": role
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body: serde_json::Value = response.json();
    body["id"].as_str().expect("id in response").to_string()
}

/// Logs in with the shared strong password and returns the access token.
pub async fn login(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": STRONG_PASSWORD }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    body["access_token"]
        .as_str()
        .expect("access_token in response")
        .to_string()
}
