//! shelfcheck-mcp server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shelfcheck_client::{CatalogEngine, EngineConfig};
use shelfcheck_core::AppConfig;
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
    let engine_config = EngineConfig::from_app_config(&config)?;
    let engine = Arc::new(CatalogEngine::new(engine_config)?);
    let sweeper = engine.spawn_cache_sweeper();

    tracing::info!(
        base_url = %engine.config().base_url,
        max_concurrent = engine.config().max_concurrent,
        "Starting shelfcheck server on stdio transport"
    );

    let handler = handler::ShelfcheckServer::new(engine.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    engine.throttle().close();
    sweeper.abort();

    Ok(())
}
