//! Init command implementation
//!
//! Scaffolds `kitchai.toml`, `.env.example` and the `data/` directory.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    Success,
    /// kitchai.toml already exists and `--force` was not given
    AlreadyExists,
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// Host address for the server
    pub host: String,
    /// Port for the server
    pub port: u16,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing KitchAI");

    let base_path = &config.path;

    let config_path = base_path.join("kitchai.toml");
    if config_path.exists() && !config.force {
        output.warning("kitchai.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    let data_dir = base_path.join("data");
    if data_dir.exists() {
        output.skipped("data", "already exists");
    } else if let Err(e) = fs::create_dir_all(&data_dir) {
        output.error(&format!("Failed to create data directory: {}", e));
        return InitResult::Error(e.to_string());
    } else {
        output.created("directory", "data");
    }

    output.subheader("Creating configuration files");

    if let Err(e) = write_file(&config_path, &generate_kitchai_toml(&config), config.force) {
        output.error(&format!("Failed to create kitchai.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "kitchai.toml");

    let env_example_path = base_path.join(".env.example");
    if let Err(e) = write_file(&env_example_path, &generate_env_example(), config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("env", ".env.example");

    output.complete("KitchAI configuration created");

    output.header("Next Steps");
    output.newline();
    output.info("1. Set up environment variables:");
    output.command("cp .env.example .env");
    output.command("# Edit .env and set JWT_SECRET_KEY (at least 32 characters)");
    output.newline();
    output.info("2. Start the server:");
    output.command("kitchai-server");

    output.hint(&format!(
        "Server will be available at http://{}:{}",
        config.host, config.port
    ));

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn generate_kitchai_toml(config: &InitConfig) -> String {
    format!(
        r#"# KitchAI server configuration

[server]
host = "{host}"
port = {port}
log_level = "info"
# "pretty" or "json"
log_format = "pretty"
# "development" generates a temporary JWT secret when none is set;
# "production" refuses to start without one.
environment = "development"

[auth]
jwt_secret_env = "JWT_SECRET_KEY"
jwt_algorithm = "HS256"
token_ttl_minutes = 60
max_failed_attempts = 5
lockout_duration_minutes = 15
store_timeout_secs = 5

[database]
# Local SQLite file, or ":memory:"
url = "./data/kitchai.db"
# Remote Turso (requires the `turso` feature); used when both are set
turso_url_env = "TURSO_DATABASE_URL"
turso_token_env = "TURSO_AUTH_TOKEN"
seed_permissions = true
"#,
        host = config.host,
        port = config.port
    )
}

fn generate_env_example() -> String {
    r#"# KitchAI environment

# Token signing secret (required in production, at least 32 characters)
JWT_SECRET_KEY=change-me-to-a-long-random-secret-value

# Remote Turso database (optional)
# TURSO_DATABASE_URL=libsql://your-db.turso.io
# TURSO_AUTH_TOKEN=

# Log filter, overrides server.log_level
RUST_LOG=info,kitchai=debug
"#
    .to_string()
}
