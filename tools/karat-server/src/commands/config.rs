//! Configuration commands.

use anyhow::{bail, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, ServerConfig, CONFIG_NAMES};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Get { key } => get_config(&key, ctx),
        ConfigCommand::Init { force } => init_config(force, ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = ctx.config.redacted();

    if ctx.output.is_json() {
        ctx.output.json(&config);
        return Ok(());
    }

    ctx.output.header("Effective Configuration");
    match &ctx.source {
        Some(path) => ctx.output.kv("source", &path.display().to_string()),
        None => ctx.output.kv("source", "defaults"),
    }

    ctx.output.info("[server]");
    ctx.output.kv("bind", &config.server.bind);
    ctx.output.kv("admin_token", config.server.admin_token.as_deref().unwrap_or("(none)"));
    ctx.output.kv("event_capacity", &config.server.event_capacity.to_string());

    ctx.output.info("[storage]");
    ctx.output.kv("backend", config.storage.backend.as_str());
    if let Some(url) = &config.storage.database_url {
        ctx.output.kv("database_url", url);
    }
    ctx.output.kv("max_connections", &config.storage.max_connections.to_string());

    ctx.output.info("[pricing]");
    ctx.output.kv("api_url", &config.pricing.api_url);
    ctx.output.kv("api_key", config.pricing.api_key.as_deref().unwrap_or("(none)"));
    ctx.output.kv("currency", &config.pricing.currency);
    ctx.output.kv("usd_to_local", &config.pricing.usd_to_local.to_string());
    ctx.output.kv("fallback_gold", &config.pricing.fallback_gold.to_string());
    ctx.output.kv("fallback_silver", &config.pricing.fallback_silver.to_string());

    ctx.output.info("[receipts]");
    ctx.output.kv("directory", &config.receipts.directory.display().to_string());

    ctx.output.info("[sessions]");
    ctx.output.kv("idle_timeout_secs", &config.sessions.idle_timeout_secs.to_string());

    ctx.output.info("[logging]");
    ctx.output.kv("level", &config.logging.level);
    ctx.output.kv("format", &format!("{:?}", config.logging.format).to_lowercase());

    Ok(())
}

fn get_config(key: &str, ctx: &Context) -> Result<()> {
    let value = get_config_value(&ctx.config.redacted(), key)?;

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({ "key": key, "value": value }));
    } else {
        println!("{}", value);
    }

    Ok(())
}

fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join(CONFIG_NAMES[0]);

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, generate_default_config())?;
    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.debug(&format!(
        "validating {}",
        ctx.source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults".to_string())
    ));
    ctx.config.validate()?;

    if ctx.config.server.admin_token.is_none() {
        ctx.output.warn("server.admin_token is unset; admin endpoints are open");
    }
    if ctx.config.pricing.api_key.is_none() {
        ctx.output.warn("pricing.api_key is unset; metal prices use the fallback rates");
    }
    let receipts = ctx.resolve_path(&ctx.config.receipts.directory);
    if receipts.exists() && !receipts.is_dir() {
        bail!("receipts.directory is not a directory: {}", receipts.display());
    }

    ctx.output.success("Configuration is valid");
    Ok(())
}

fn get_config_value(config: &ServerConfig, key: &str) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(config)?;
    for part in key.split('.') {
        value = match value.get(part) {
            Some(next) => next.clone(),
            None => bail!("Unknown config key: {}", key),
        };
    }
    Ok(value)
}
