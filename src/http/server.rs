//! HTTP server for the catalog API

use super::handler::{add_graph, download_graphs, download_sample, filter_graphs, list_graphs, status_handler};
use super::AppState;
use crate::catalog::CatalogStore;
use crate::config::ServerConfig;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            warn!("Ignoring invalid CORS origin {:?}; cross-origin requests will be refused", origin);
            layer
        }
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);
    Router::new()
        .route("/api/graphs", get(list_graphs))
        .route("/api/graphs/filter", post(filter_graphs))
        .route("/api/graphs/add", post(add_graph))
        .route("/api/graphs/download", post(download_graphs))
        .route("/api/graphs/download-sample", post(download_sample))
        .route("/api/status", get(status_handler))
        .layer(cors)
        .with_state(state)
}

/// HTTP server for the catalog API
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    pub fn new(store: Arc<RwLock<CatalogStore>>, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(store, config),
        }
    }

    /// Serve until Ctrl-C
    pub async fn start(&self) -> std::io::Result<()> {
        let addr = self.state.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("Graph catalog API listening on http://{}", addr);

        axum::serve(listener, router(self.state.clone()))
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
