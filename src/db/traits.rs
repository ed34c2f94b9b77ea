//! Storage abstraction traits
//!
//! The login core talks to three collaborators through these traits:
//! [`AccountStore`] (mutable account records), [`RoleStore`] (read-mostly
//! role and permission reference data) and [`AttemptLedger`] (append-only
//! audit trail). [`TursoClient`](super::turso::TursoClient) implements all
//! three; tests can substitute their own.
//!
//! # Example
//!
//! ```rust,ignore
//! use kitchai::db::DatabaseProvider;
//!
//! // In-memory database (tests and quick local runs)
//! let db = DatabaseProvider::Memory.create_client().await?;
//!
//! // File-based SQLite
//! let db = DatabaseProvider::SQLite { path: "data/kitchai.db".into() }.create_client().await?;
//! ```

use crate::types::{AppError, Result};
use crate::users::{Account, LoginAttempt, Permission, Role, RoleName};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

/// Database provider configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabaseProvider {
    /// In-memory SQLite database (ephemeral, lost on restart)
    #[default]
    Memory,
    /// File-based SQLite database
    SQLite {
        /// Path to the SQLite database file
        path: String,
    },
    /// Remote Turso database (requires network access)
    #[cfg(feature = "turso")]
    Turso {
        /// The Turso database URL (e.g., `libsql://your-db.turso.io`)
        url: String,
        /// Authentication token for the Turso database
        auth_token: String,
    },
}

impl DatabaseProvider {
    /// Connect and initialize the schema.
    pub async fn create_client(&self) -> Result<super::turso::TursoClient> {
        match self {
            DatabaseProvider::Memory => super::turso::TursoClient::new_memory().await,
            DatabaseProvider::SQLite { path } => super::turso::TursoClient::new_local(path).await,
            #[cfg(feature = "turso")]
            DatabaseProvider::Turso { url, auth_token } => {
                super::turso::TursoClient::new_remote(url.clone(), auth_token.clone()).await
            }
        }
    }

    /// Pick a provider from the `[database]` config table.
    ///
    /// Remote Turso wins when both of its environment variables are set
    /// (and the `turso` feature is on); otherwise the local path is used,
    /// with `:memory:` selecting an in-memory database.
    pub fn from_config(config: &crate::utils::toml_config::DatabaseConfig) -> Self {
        #[cfg(feature = "turso")]
        {
            if let (Ok(url), Ok(token)) = (
                std::env::var(&config.turso_url_env),
                std::env::var(&config.turso_token_env),
            ) {
                if !url.is_empty() && !token.is_empty() {
                    return DatabaseProvider::Turso {
                        url,
                        auth_token: token,
                    };
                }
            }
        }

        if config.url.is_empty() || config.url == ":memory:" {
            DatabaseProvider::Memory
        } else {
            DatabaseProvider::SQLite {
                path: config.url.clone(),
            }
        }
    }
}

/// Read/write access to account records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Case-insensitive email lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>>;

    /// Insert a new account. A duplicate email (any case) is a validation error.
    async fn insert_account(&self, account: &Account) -> Result<()>;

    /// Persist every mutable field: name, phone, role, counter, lockout, `updated_at`.
    async fn update_account(&self, account: &Account) -> Result<()>;

    /// Write only the role and `updated_at`, leaving counter and lockout
    /// untouched. A missing account is [`AppError::NotFound`].
    async fn update_role(&self, id: &str, role_id: &str, updated_at: DateTime<Utc>) -> Result<()>;
}

/// Read-only lookup of roles and their permission sets.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// All roles ordered by name.
    async fn list_roles(&self) -> Result<Vec<Role>>;

    async fn find_role_by_id(&self, id: &str) -> Result<Option<Role>>;

    async fn find_role_by_name(&self, name: RoleName) -> Result<Option<Role>>;

    /// All permissions ordered by name.
    async fn list_permissions(&self) -> Result<Vec<Permission>>;

    /// Permissions granted to a role, distinct and ordered by name.
    async fn permissions_for_role(&self, role_id: &str) -> Result<Vec<Permission>>;
}

/// Append-only audit trail of login attempts.
#[async_trait]
pub trait AttemptLedger: Send + Sync {
    async fn record_attempt(&self, attempt: &LoginAttempt) -> Result<()>;

    /// Most recent attempts for an email (case-insensitive), newest first.
    async fn attempts_for_email(&self, email: &str, limit: u32) -> Result<Vec<LoginAttempt>>;
}

/// Bounds a store call; expiry surfaces as [`AppError::StoreUnavailable`].
pub async fn with_timeout<T, F>(limit: Duration, operation: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "store call timed out");
            Err(AppError::StoreUnavailable(format!(
                "{} timed out after {:?}",
                operation, limit
            )))
        }
    }
}
