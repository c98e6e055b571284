//! HTTP side of the book catalog: the reqwest client for the remote book
//! service, and a development server implementing the same contract.

use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use tokio::sync::RwLock;

use catalog_kernel::settings::ServerSettings;

pub mod client;
pub mod dev_server;
pub mod error;
pub mod router;

pub use client::HttpBookService;
pub use dev_server::{BookRegistry, SharedRegistry};

use router::RouterBuilder;

/// Start the development book service and serve until the process exits.
pub async fn start_server(settings: &ServerSettings, registry: BookRegistry) -> anyhow::Result<()> {
    let address = format!("{}:{}", settings.host, settings.port);
    tracing::info!("starting book service on {}", address);

    let app = build_router(Arc::new(RwLock::new(registry)), settings);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to {address}"))?;

    tracing::info!("book service listening on http://{}", address);

    axum::serve(listener, app)
        .await
        .context("HTTP server failed")?;

    Ok(())
}

/// Build the service router with `/books` routes and global middleware.
pub fn build_router(registry: SharedRegistry, settings: &ServerSettings) -> Router {
    RouterBuilder::new()
        .route("/healthz", get(health_check))
        .merge(dev_server::routes(registry))
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(settings.request_timeout_ms)
        .build()
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
