use anyhow::Context;
use kitchai::{
    auth::CredentialHasher,
    build_app,
    cli::{
        init::{self, InitConfig, InitResult},
        output::Output,
        Cli, Commands,
    },
    db::DatabaseProvider,
    utils::toml_config::{KitchaiConfig, LogFormat},
    AppState,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Some(Commands::Init {
            path,
            force,
            host,
            port,
        }) => {
            let config = InitConfig {
                path,
                force,
                host,
                port,
            };
            match init::run(config, &output) {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => Err(anyhow::anyhow!("init failed: {}", e)),
            }
        }
        Some(Commands::Config { validate }) => show_config(&cli.config, validate, &output),
        None => serve(&cli.config, cli.verbose, &output).await,
    }
}

fn show_config(path: &Path, validate_only: bool, output: &Output) -> anyhow::Result<()> {
    let config = match KitchaiConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            output.error(&format!("{}: {}", path.display(), e));
            return Err(e.into());
        }
    };

    if validate_only {
        output.success(&format!("{} is valid", path.display()));
        return Ok(());
    }

    let secret_state = if config.resolve_env(&config.auth.jwt_secret_env).is_some() {
        "set"
    } else {
        "not set"
    };

    output.header(&format!("Configuration ({})", path.display()));
    output.subheader("server");
    output.kv("address", &config.bind_address());
    output.kv("log_level", &config.server.log_level);
    output.kv("log_format", &format!("{:?}", config.server.log_format).to_lowercase());
    output.kv("environment", &format!("{:?}", config.server.environment).to_lowercase());

    output.subheader("auth");
    output.kv(
        "jwt_secret",
        &format!("${} ({})", config.auth.jwt_secret_env, secret_state),
    );
    output.kv("jwt_algorithm", &config.auth.jwt_algorithm);
    output.kv("token_ttl_minutes", &config.auth.token_ttl_minutes.to_string());
    output.kv("max_failed_attempts", &config.auth.max_failed_attempts.to_string());
    output.kv(
        "lockout_duration_minutes",
        &config.auth.lockout_duration_minutes.to_string(),
    );
    output.kv("store_timeout_secs", &config.auth.store_timeout_secs.to_string());

    output.subheader("database");
    output.kv("url", &config.database.url);
    output.kv("seed_permissions", &config.database.seed_permissions.to_string());
    output.newline();

    Ok(())
}

fn init_tracing(config: &KitchaiConfig, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    match config.server.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

async fn serve(config_path: &Path, verbose: bool, output: &Output) -> anyhow::Result<()> {
    let config_found = config_path.exists();
    let config = KitchaiConfig::load_or_default(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    init_tracing(&config, verbose);
    output.banner();
    if !config_found {
        tracing::warn!(
            path = %config_path.display(),
            "config file not found, running with defaults (see `kitchai-server init`)"
        );
    }

    let jwt_secret = config.jwt_secret()?;

    let provider = DatabaseProvider::from_config(&config.database);
    let db = Arc::new(provider.create_client().await?);
    tracing::info!(provider = ?provider_label(&provider), "database ready");

    if config.database.seed_permissions {
        db.seed_default_permissions().await?;
    }

    let addr = config.bind_address();
    let state = AppState::new(config, db, CredentialHasher::new(), &jwt_secret)?;
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(address = %addr, "KitchAI server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn provider_label(provider: &DatabaseProvider) -> &'static str {
    match provider {
        DatabaseProvider::Memory => "memory",
        DatabaseProvider::SQLite { .. } => "sqlite",
        #[cfg(feature = "turso")]
        DatabaseProvider::Turso { .. } => "turso",
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
