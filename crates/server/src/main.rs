//! storecache entry point.
//!
//! Boots the cache layer for the configured deployment and serves MCP on
//! stdio. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use storecache_client::{FetchClient, FetchConfig, Registration, TracingNotifier};
use storecache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(generation = %config.generation, db = %config.db_path.display(), "Starting storecache on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config))?);
    let registration = Arc::new(Registration::new(db, network));

    match tools::worker::restore_initial(&registration, &config).await {
        Ok(state) => tracing::info!(generation = %config.generation, ?state, "deployment ready"),
        Err(e) => tracing::warn!(error = %e, "install failed; requests pass through to the network"),
    }

    let handler = handler::StoreCacheServer::new(registration, Arc::new(config), Arc::new(TracingNotifier));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
