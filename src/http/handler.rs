//! HTTP handlers for the catalog API

use super::AppState;
use crate::catalog::{CatalogError, FilterSpec, NewGraph, Page};
use crate::export::{ArchiveExporter, ExportError, FILTERED_ARCHIVE_NAME, SAMPLE_ARCHIVE_NAME};
use crate::sampling::{sample_matching, SampleRequest};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors surfaced to HTTP clients as `{ "message": ... }`
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Error creating zip file: {0}")]
    Export(#[from] ExportError),

    #[error("Sampling timed out after {0} ms")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Catalog(CatalogError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Catalog(CatalogError::InvalidRecord(_)) | ApiError::Catalog(CatalogError::Query(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Catalog(CatalogError::Storage(_)) | ApiError::Export(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            debug!("Rejected request: {}", self);
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FilterRequest {
    pub filters: FilterSpec,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DownloadRequest {
    pub filters: FilterSpec,
}

fn zip_attachment(bytes: Vec<u8>, file_name: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
        ],
        bytes,
    )
        .into_response()
}

/// GET /api/graphs
pub async fn list_graphs(State(state): State<AppState>, Query(params): Query<PageParams>) -> Json<Page> {
    let store = state.store.read().await;
    let all = crate::catalog::CatalogQuery::all();
    Json(store.page(&all, params.page.unwrap_or(1), params.limit.unwrap_or(0)))
}

/// POST /api/graphs/filter
pub async fn filter_graphs(
    State(state): State<AppState>,
    payload: Result<Json<FilterRequest>, JsonRejection>,
) -> ApiResult<Json<Page>> {
    let Json(request) = payload?;
    let query = request.filters.compile().map_err(CatalogError::from)?;

    let store = state.store.read().await;
    let page = store.page(&query, request.page.unwrap_or(1), request.limit.unwrap_or(0));
    debug!("Filter matched {} graphs", page.total_records);
    Ok(Json(page))
}

/// POST /api/graphs/add
pub async fn add_graph(
    State(state): State<AppState>,
    payload: Result<Json<NewGraph>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(graph) = payload?;

    let mut store = state.store.write().await;
    let id = store.insert(graph, None)?;
    let record = store.get(id).ok_or(CatalogError::NotFound(id))?.without_payload();
    info!("Added {} ({})", id, record.file_name);

    Ok((StatusCode::CREATED, Json(record)))
}

/// POST /api/graphs/download
pub async fn download_graphs(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let query = request.filters.compile().map_err(CatalogError::from)?;

    let store = Arc::clone(&state.store);
    let (bytes, _summary) = tokio::task::spawn_blocking(move || {
        let records = store.blocking_read().find(&query);
        ArchiveExporter::new().to_bytes(&records)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(zip_attachment(bytes, FILTERED_ARCHIVE_NAME))
}

/// POST /api/graphs/download-sample
pub async fn download_sample(
    State(state): State<AppState>,
    payload: Result<Json<SampleRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let query = request.filters.compile().map_err(CatalogError::from)?;
    let sample_size = request.size_or(state.config.default_sample_size);

    let store = Arc::clone(&state.store);
    let sampling = state.config.sampling;
    let method = request.sampling_method;
    let seed = request.seed;

    // Filtering, selection and zipping all run on the blocking pool under the timeout
    let task = tokio::task::spawn_blocking(move || {
        let sample = {
            let store = store.blocking_read();
            sample_matching(&store, &query, sample_size, method, seed, &sampling)
        };
        ArchiveExporter::new().to_bytes(&sample.records)
    });

    let timeout_ms = state.config.sample_timeout_ms;
    let (bytes, summary) = match tokio::time::timeout(state.config.sample_timeout(), task).await {
        Ok(joined) => joined.map_err(|e| ApiError::Internal(e.to_string()))??,
        Err(_) => {
            warn!("Sampling {} graphs ({}) exceeded {} ms", sample_size, method, timeout_ms);
            return Err(ApiError::Timeout(timeout_ms));
        }
    };

    info!("Sample download: {} files ({})", summary.written, method);
    Ok(zip_attachment(bytes, SAMPLE_ARCHIVE_NAME))
}

/// GET /api/status
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.read().await;
    Json(json!({
        "status": "healthy",
        "version": crate::VERSION,
        "storage": {
            "graphs": store.len(),
            "persistent": store.is_persistent(),
        }
    }))
}
