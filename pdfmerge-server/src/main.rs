//! pdfmerge-server - Merge uploaded PDF files over HTTP.
//!
//! Loads `.env`, reads configuration from flags and environment, then serves
//! the merge API until interrupted.

mod cli;
mod routes;

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use pdfmerge::pipeline::MergeService;

const DEFAULT_LOG_FILTER: &str = "pdfmerge=info,pdfmerge_server=info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.to_config();
    config.validate().context("Invalid configuration")?;

    let service = Arc::new(MergeService::new(config));
    let addr = cli.addr();

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(
        %addr,
        version = pdfmerge::VERSION,
        max_files = ?service.config().limits.max_files,
        max_upload_bytes = service.config().limits.max_upload_bytes,
        "Listening"
    );

    axum::serve(listener, routes::app(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
