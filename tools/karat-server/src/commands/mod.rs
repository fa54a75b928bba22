//! CLI command implementations.

pub mod config;
pub mod migrate;
pub mod serve;

use clap::{Args, Subcommand};

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on, overriding `server.bind`.
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Apply database migrations before serving (postgres backend only).
    #[arg(long)]
    pub migrate: bool,
}

/// Arguments for the migrate command.
#[derive(Args)]
pub struct MigrateArgs {
    /// Database URL, overriding `storage.database_url`.
    #[arg(long)]
    pub database_url: Option<String>,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration, secrets masked.
    Show,
    /// Get a config value.
    Get {
        /// Config key (dot-separated), e.g. `storage.backend`.
        key: String,
    },
    /// Write a starter karat.toml in the current directory.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the configuration.
    Validate,
}
