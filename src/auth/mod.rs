//! Authentication and authorization
//!
//! # Module Structure
//!
//! - [`auth::password`](crate::auth::password) - Argon2id credential hashing
//! - [`auth::jwt`](crate::auth::jwt) - Token issuance, verification and refresh
//! - [`auth::engine`](crate::auth::engine) - Login decisions, failure counting and lockout
//! - [`auth::authorization`](crate::auth::authorization) - Role to permission resolution
//! - [`auth::middleware`](crate::auth::middleware) - Axum middleware and extractors
//!
//! # Security Features
//!
//! - **Password Hashing**: Argon2id with a fixed work factor; malformed hashes fail closed
//! - **Lockout**: 5 failed attempts lock an account for 15 minutes (configurable)
//! - **Tokens**: HMAC-signed JWTs (HS256 by default), stateless, no grace window
//! - **Audit**: every login attempt is written to the attempt ledger
//!
//! # Usage
//!
//! ```ignore
//! use kitchai::auth::engine::AuthEngine;
//!
//! let outcome = engine.authenticate("ana@x.com", "Secure123!", Some(ip)).await?;
//! let account = outcome.into_result()?;
//! let token = tokens.issue(&account.id, &account.email, &account.role_id, 60)?;
//! ```
//!
//! Protected routes are wrapped with
//! [`auth_middleware`](crate::auth::middleware::auth_middleware), and handlers
//! read the caller through the [`AuthUser`](crate::auth::middleware::AuthUser)
//! extractor.

/// Role to permission resolution and capability checks.
pub mod authorization;
/// Login decisions with failure counting and lockout.
pub mod engine;
/// Token issuance, verification and refresh.
pub mod jwt;
/// Authentication middleware and extractors for protected routes.
pub mod middleware;
/// Password hashing and verification.
pub mod password;

pub use authorization::AuthorizationResolver;
pub use engine::{AuthEngine, AuthOutcome, LoginRejection};
pub use jwt::{TokenError, TokenService};
pub use password::CredentialHasher;
