//! karat - back-office server for a jewelry shop.
//!
//! Commands:
//! - `karat serve` - Run the HTTP and websocket server
//! - `karat migrate` - Apply Postgres schema migrations
//! - `karat config` - Inspect and create configuration

mod commands;
mod config;
mod context;
mod http;
mod logging;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{ConfigArgs, MigrateArgs, ServeArgs};

/// karat - catalog, cart and checkout back office
#[derive(Parser)]
#[command(name = "karat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP and websocket server
    Serve(ServeArgs),

    /// Apply database migrations
    Migrate(MigrateArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = output::Output::new(cli.verbose, cli.json);
    let ctx = match context::Context::load(cli.config.as_deref(), output.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    if matches!(cli.command, Commands::Serve(_) | Commands::Migrate(_)) {
        if let Err(e) = logging::init(&ctx.config.logging, ctx.output.is_verbose()) {
            ctx.output.warn(&format!("{:#}", e));
        }
    }

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::run(args, &ctx).await,
        Commands::Migrate(args) => commands::migrate::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
