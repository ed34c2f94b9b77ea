//! TOML-based configuration for KitchAI
//!
//! Server, authentication and database settings are read from a TOML file
//! (`kitchai.toml`). Secrets are never written in the file itself: the file
//! names the environment variables that hold them.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3000
//!
//! [auth]
//! jwt_secret_env = "JWT_SECRET_KEY"
//! max_failed_attempts = 5
//! lockout_duration_minutes = 15
//!
//! [database]
//! url = "./data/kitchai.db"
//! ```

use jsonwebtoken::Algorithm;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::users::LockoutPolicy;

const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Root configuration structure loaded from kitchai.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KitchaiConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default)]
    pub environment: Environment,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            environment: Environment::default(),
        }
    }
}

// ============= Authentication Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable name containing the JWT secret
    #[serde(default = "default_jwt_secret_env")]
    pub jwt_secret_env: String,

    /// HS256, HS384 or HS512
    #[serde(default = "default_jwt_algorithm")]
    pub jwt_algorithm: String,

    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,

    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,

    #[serde(default = "default_lockout_duration_minutes")]
    pub lockout_duration_minutes: i64,

    /// Upper bound on any single store call made while handling a request
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
}

fn default_jwt_secret_env() -> String {
    "JWT_SECRET_KEY".to_string()
}

fn default_jwt_algorithm() -> String {
    "HS256".to_string()
}

fn default_token_ttl_minutes() -> i64 {
    60
}

fn default_max_failed_attempts() -> u32 {
    5
}

fn default_lockout_duration_minutes() -> i64 {
    15
}

fn default_store_timeout_secs() -> u64 {
    5
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret_env: default_jwt_secret_env(),
            jwt_algorithm: default_jwt_algorithm(),
            token_ttl_minutes: default_token_ttl_minutes(),
            max_failed_attempts: default_max_failed_attempts(),
            lockout_duration_minutes: default_lockout_duration_minutes(),
            store_timeout_secs: default_store_timeout_secs(),
        }
    }
}

impl AuthConfig {
    pub fn lockout_policy(&self) -> LockoutPolicy {
        LockoutPolicy::new(self.max_failed_attempts, self.lockout_duration_minutes)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn algorithm(&self) -> Result<Algorithm, ConfigError> {
        let algorithm = Algorithm::from_str(self.jwt_algorithm.trim()).map_err(|_| {
            ConfigError::ValidationError(format!(
                "Unknown JWT algorithm '{}'",
                self.jwt_algorithm
            ))
        })?;

        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
            other => Err(ConfigError::ValidationError(format!(
                "JWT algorithm {:?} is not supported: use HS256, HS384 or HS512",
                other
            ))),
        }
    }
}

// ============= Database Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local database path, or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Environment variable for Turso URL (optional cloud config)
    #[serde(default = "default_turso_url_env")]
    pub turso_url_env: String,

    /// Environment variable for Turso auth token
    #[serde(default = "default_turso_token_env")]
    pub turso_token_env: String,

    /// Seed the default permission catalogue and grants at start-up
    #[serde(default = "default_true")]
    pub seed_permissions: bool,
}

fn default_database_url() -> String {
    "./data/kitchai.db".to_string()
}

fn default_turso_url_env() -> String {
    "TURSO_DATABASE_URL".to_string()
}

fn default_turso_token_env() -> String {
    "TURSO_AUTH_TOKEN".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            turso_url_env: default_turso_url_env(),
            turso_token_env: default_turso_token_env(),
            seed_permissions: default_true(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl KitchaiConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load from `path` if it exists, defaults otherwise.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::FileNotFound(missing)) => {
                warn!(path = %missing.display(), "config file not found, using defaults");
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: KitchaiConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges and the signing algorithm
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.max_failed_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "auth.max_failed_attempts must be greater than 0".to_string(),
            ));
        }
        if self.auth.lockout_duration_minutes <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.lockout_duration_minutes must be greater than 0".to_string(),
            ));
        }
        if self.auth.token_ttl_minutes <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.token_ttl_minutes must be greater than 0".to_string(),
            ));
        }
        if self.auth.store_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "auth.store_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.auth.jwt_secret_env.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret_env must name an environment variable".to_string(),
            ));
        }
        self.auth.algorithm()?;

        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok().filter(|v| !v.is_empty())
    }

    /// Get the JWT secret from the environment.
    ///
    /// In development a missing secret is replaced by a random one, so
    /// tokens do not survive a restart. In production it is an error.
    pub fn jwt_secret(&self) -> Result<String, ConfigError> {
        if let Some(secret) = self.resolve_env(&self.auth.jwt_secret_env) {
            if self.server.environment == Environment::Production
                && secret.len() < MIN_PRODUCTION_SECRET_LEN
            {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be at least {} characters in production",
                    self.auth.jwt_secret_env, MIN_PRODUCTION_SECRET_LEN
                )));
            }
            return Ok(secret);
        }

        match self.server.environment {
            Environment::Production => {
                Err(ConfigError::MissingEnvVar(self.auth.jwt_secret_env.clone()))
            }
            Environment::Development => {
                warn!(
                    env = %self.auth.jwt_secret_env,
                    "JWT secret not set, generated a temporary one for this process"
                );
                let mut bytes = [0u8; 32];
                rand::rng().fill_bytes(&mut bytes);
                Ok(hex::encode(bytes))
            }
        }
    }

    /// Host and port as a socket address string.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
