//! Graphcat: a catalog of graph datasets
//!
//! Every cataloged graph carries precomputed structural metrics (node and
//! edge counts, maximum degree, chromatic number, clique number, vertex cover
//! size, planarity) and its GraphML file. The catalog can be filtered on those
//! metrics, paged through, exported as a zip, and sampled.
//!
//! # Modules
//!
//! - [`catalog`]: records, filter compilation, in-memory store, RocksDB storage
//! - [`ingest`]: CSV import and payload refresh
//! - [`export`]: zip archives of graph files
//! - [`sampling`]: random, representative and cluster sampling over filter results
//! - [`http`]: axum API
//! - [`config`]: server configuration
//!
//! ## Example Usage
//!
//! ```rust
//! use graphcat::catalog::{CatalogStore, FilterSpec, Metric, NewGraph, RangeFilter};
//! use graphcat::sampling::{sample_catalog, SamplingConfig, SamplingMethod};
//!
//! let mut store = CatalogStore::new();
//! for n in 1..=50u64 {
//!     let graph = NewGraph::new(format!("g{}.graphml", n)).with_metric(Metric::NumNodes, n * 10);
//!     store.insert(graph, None).unwrap();
//! }
//!
//! let filters = FilterSpec::new().with_range(Metric::NumNodes, RangeFilter::at_least(100.0));
//! let sample = sample_catalog(&store, &filters, 5, SamplingMethod::Representative, Some(7), &SamplingConfig::default())
//!     .unwrap();
//! assert_eq!(sample.len(), 5);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod config;
pub mod export;
pub mod http;
pub mod ingest;
pub mod sampling;

pub use catalog::{
    CatalogError, CatalogQuery, CatalogResult, CatalogStore, FilterSpec, GraphId, GraphRecord, Metric, NewGraph, Page,
};
pub use config::{ConfigError, ServerConfig};
pub use export::{ArchiveExporter, ExportError, ExportSummary};
pub use http::{AppState, HttpServer};
pub use ingest::{IngestError, IngestOptions, IngestReport};
pub use sampling::{sample_catalog, SampleRequest, SamplingConfig, SamplingMethod};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
