//! Graph catalog: records, filters and storage
//!
//! - `record`: the cataloged graph and its metrics
//! - `query`: filter documents compiled into predicates
//! - `store`: in-memory catalog with optional write-through
//! - `storage`: RocksDB persistence

pub mod query;
pub mod record;
pub mod storage;
pub mod store;

pub use query::{
    BoundKind, CatalogQuery, FilterSpec, MetricRange, PlanarFilter, QueryError, QueryResult, RangeFilter,
};
pub use record::{validate_file_name, GraphId, GraphRecord, Metric, NewGraph};
pub use storage::{PersistentStorage, StorageError, StorageResult};
pub use store::{CatalogError, CatalogResult, CatalogStore, Page, DEFAULT_PAGE_LIMIT};
