//! HTTP API for the graph catalog

pub mod handler;
pub mod server;

pub use handler::ApiError;
pub use server::{router, HttpServer};

use crate::catalog::CatalogStore;
use crate::config::ServerConfig;
use std::sync::Arc;
use tokio::sync::RwLock;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<CatalogStore>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(store: Arc<RwLock<CatalogStore>>, config: ServerConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
