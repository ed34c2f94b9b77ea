//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer for KitchAI, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//! - [`api::openapi`](crate::api::openapi) - OpenAPI document
//!
//! # API Endpoints
//!
//! ## Authentication (`/api/auth`)
//! - `POST /api/auth/register` - Register a staff account (201)
//! - `POST /api/auth/login` - Login and receive a JWT (401 wrong credentials, 429 locked)
//! - `POST /api/auth/refresh` - Exchange a valid token for a fresh one
//! - `GET /api/auth/me` - Current account and permissions (bearer)
//! - `GET /api/auth/attempts` - Login attempt history (bearer, `manage-users`)
//!
//! ## Roles (`/api/roles`)
//! - `GET /api/roles/` - List roles
//! - `GET /api/roles/{role_id}/permissions` - Role with its permissions
//! - `GET /api/roles/permissions/` - List permissions
//! - `PUT /api/roles/users/{user_id}/role` - Assign a role to an account
//!
//! ## Health
//! - `GET /health` - Liveness, plain `OK`
//! - `GET /api/health` - Service and database health
//!
//! # Authentication
//!
//! Protected endpoints require a valid JWT token in the `Authorization` header:
//! ```text
//! Authorization: Bearer <token>
//! ```
//!
//! # OpenAPI Documentation
//!
//! The document is served at `/api-docs/openapi.json`. When the `swagger-ui`
//! feature is enabled, interactive documentation is available at `/swagger-ui/`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// OpenAPI document for the HTTP API.
pub mod openapi;
/// Router configuration and route definitions.
pub mod routes;
