//! CLI module for KitchAI
//!
//! Provides command-line interface parsing and handling for the kitchai-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// KitchAI - restaurant management backend
///
/// Staff accounts, brute-force protected login, JWT sessions and
/// role/permission authorization.
#[derive(Parser, Debug)]
#[command(
    name = "kitchai-server",
    version,
    about = "KitchAI - restaurant management backend",
    long_about = "Staff accounts, brute-force protected login, JWT sessions and\n\
                  role/permission authorization for the KitchAI restaurant backend.\n\n\
                  Run without arguments to start the server, or use 'init' to scaffold a configuration.",
    after_help = "EXAMPLES:\n    \
                  kitchai-server init                # Scaffold kitchai.toml and .env.example\n    \
                  kitchai-server config --validate   # Check the configuration\n    \
                  kitchai-server                     # Start the server\n    \
                  kitchai-server --config my.toml    # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "kitchai.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold kitchai.toml and .env.example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files without prompting
        #[arg(short, long)]
        force: bool,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "3000")]
        port: u16,
    },

    /// Show the effective configuration (secrets elided)
    Config {
        /// Only validate the configuration file
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_starts_server() {
        let cli = Cli::try_parse_from(["kitchai-server"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("kitchai.toml"));
    }

    #[test]
    fn parses_init() {
        let cli = Cli::try_parse_from(["kitchai-server", "init", "/tmp/site", "--force", "--port", "8080"])
            .unwrap();
        match cli.command {
            Some(Commands::Init {
                path, force, port, ..
            }) => {
                assert_eq!(path, PathBuf::from("/tmp/site"));
                assert!(force);
                assert_eq!(port, 8080);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "kitchai-server",
            "config",
            "--validate",
            "--config",
            "other.toml",
            "--no-color",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Config { validate: true })));
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert!(cli.no_color);
    }
}
