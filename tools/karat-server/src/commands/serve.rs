//! Run the HTTP server.

use anyhow::{Context as _, Result};
use tokio::net::TcpListener;

use super::ServeArgs;
use crate::config::StorageBackend;
use crate::context::Context;
use crate::http::{self, AppState};

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.config.clone();
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    config.receipts.directory = ctx.resolve_path(&config.receipts.directory);
    config.validate()?;

    if args.migrate {
        if config.storage.backend == StorageBackend::Postgres {
            super::migrate::apply(&config).await?;
        } else {
            ctx.output.warn("--migrate ignored: storage backend is memory");
        }
    }

    let state = AppState::from_config(&config).await?;
    let sweeper = http::spawn_session_sweeper(state.clone(), config.sessions.purge_interval());
    let app = http::build_router(state);

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!(
        bind = %config.server.bind,
        storage = config.storage.backend.as_str(),
        receipts = %config.receipts.directory.display(),
        "karat listening"
    );
    ctx.output.success(&format!("Listening on http://{}", config.server.bind));

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");
    sweeper.abort();
    tracing::info!("karat stopped");
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
