//! # plateau-api — Binary Entry Point
//!
//! Loads configuration, sweeps leftovers from a previous run out of the
//! archive root, and serves the API until Ctrl-C.

use anyhow::Context;
use plateau_api::config::AppConfig;
use plateau_api::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let state = AppState::new(config.clone());
    let summary = state
        .archives
        .sweep()
        .with_context(|| format!("preparing archive root {}", config.archive_root.display()))?;
    tracing::info!(
        partials = summary.partials_removed,
        extractions = summary.extractions_removed,
        root = %config.archive_root.display(),
        "archive root ready"
    );
    tokio::fs::create_dir_all(&config.staging_dir)
        .await
        .with_context(|| format!("creating staging dir {}", config.staging_dir.display()))?;

    let app = plateau_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("Plateau API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
