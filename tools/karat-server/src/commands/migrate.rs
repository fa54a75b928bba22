//! Apply Postgres schema migrations.

use anyhow::{Context as _, Result};
use karat_db::{Db, DbOptions};

use super::MigrateArgs;
use crate::config::ServerConfig;
use crate::context::Context;

/// Run the migrate command.
pub async fn run(args: MigrateArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.config.clone();
    if let Some(url) = args.database_url {
        config.storage.database_url = Some(url);
    }

    ctx.output.debug(&format!(
        "database: {}",
        config.redacted().storage.database_url.unwrap_or_default()
    ));
    apply(&config).await?;
    ctx.output.success("Migrations applied");
    Ok(())
}

/// Connect with the configured URL and run the embedded migrations.
pub async fn apply(config: &ServerConfig) -> Result<()> {
    let url = config
        .storage
        .database_url
        .as_deref()
        .context("No database URL: set storage.database_url, KARAT_DATABASE_URL or --database-url")?;

    let db = Db::connect(&DbOptions::new(url).with_max_connections(1))
        .await
        .context("Failed to connect to Postgres")?;
    let result = db.migrate().await.context("Migration failed");
    db.close().await;
    result
}
