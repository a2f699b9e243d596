use anyhow::Context;
use graphcat::{CatalogStore, HttpServer, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Optional YAML config as the only argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ServerConfig::load(config_path.as_deref()).context("failed to load configuration")?;

    info!("Graphcat v{}", graphcat::version());

    let store = match &config.data_path {
        Some(path) => CatalogStore::open(path).with_context(|| format!("failed to open catalog at {}", path))?,
        None => {
            info!("No data path configured, catalog is in-memory only");
            CatalogStore::new()
        }
    };
    info!("Catalog holds {} graphs", store.len());

    let store = Arc::new(RwLock::new(store));
    let server = HttpServer::new(Arc::clone(&store), config);
    server.start().await.context("HTTP server failed")?;

    store.read().await.flush()?;
    Ok(())
}
