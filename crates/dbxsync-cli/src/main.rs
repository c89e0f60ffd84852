//! dbxsync CLI - Command-line interface for dbxsync
//!
//! Provides commands for:
//! - Synchronizing local folders with Dropbox (the default)
//! - Logging in to and out of Dropbox
//! - Showing build information

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    auth::{LoginCommand, LogoutCommand},
    sync::SyncCommand,
    version::VersionCommand,
};
use dbxsync_core::config::Config;
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "dbxsync", version, about = "Bidirectional Dropbox folder sync")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Use alternate config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Synchronize all configured folders (default)
    Sync(SyncCommand),
    /// Log in to Dropbox and store the access token
    Login(LoginCommand),
    /// Remove the stored access token
    Logout(LogoutCommand),
    /// Show version and build information
    Version(VersionCommand),
}

impl Cli {
    fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }

    fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}

/// Installs the global subscriber; `RUST_LOG` overrides the level
fn init_tracing(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }
}

/// Loads, expands and validates the configuration file
fn load_config(path: &std::path::Path) -> Result<Config> {
    let mut config = Config::load(path)?;
    config.expand_paths();

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
        anyhow::bail!(
            "invalid configuration in {}:\n{}",
            path.display(),
            details.join("\n")
        );
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();
    let format = cli.output_format();
    let fmt = get_formatter(format);

    let command = cli.command.take().unwrap_or(Commands::Sync(SyncCommand));
    if let Commands::Version(cmd) = &command {
        return cmd.execute(format, &*fmt);
    }

    let config_path = cli.config_path();
    let config = load_config(&config_path)
        .with_context(|| format!("can't load configuration {}", config_path.display()))?;

    let level = if cli.debug {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    init_tracing(level, cli.json);
    info!(config = %config_path.display(), "Loaded configuration");

    match command {
        Commands::Sync(cmd) => cmd.execute(&config, &*fmt).await,
        Commands::Login(cmd) => cmd.execute(&config, &*fmt).await,
        Commands::Logout(cmd) => cmd.execute(&config, &*fmt).await,
        Commands::Version(_) => Ok(()),
    }
}
