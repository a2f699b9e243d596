//! In-memory catalog store
//!
//! Holds every record in insertion order and answers compiled queries. When
//! opened over a data directory, writes go through to RocksDB and the store is
//! rebuilt from disk on startup.

use super::query::{CatalogQuery, QueryError};
use super::record::{validate_file_name, GraphId, GraphRecord, NewGraph};
use super::storage::{PersistentStorage, StorageError};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Default page size when a client asks for zero
pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// Errors that can occur during catalog operations
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Graph {0} not found")]
    NotFound(GraphId),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid filter: {0}")]
    Query(#[from] QueryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub graphs: Vec<GraphRecord>,
    pub total_pages: usize,
    pub total_records: usize,
    pub current_page: usize,
}

/// In-memory graph catalog
#[derive(Debug)]
pub struct CatalogStore {
    /// Records in insertion order
    records: Vec<GraphRecord>,
    /// GraphId -> position in `records`
    index: HashMap<GraphId, usize>,
    next_id: u64,
    /// Write-through persistence (None = in-memory only)
    storage: Option<PersistentStorage>,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore {
    /// Create an empty, in-memory catalog
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            next_id: 1,
            storage: None,
        }
    }

    /// Open a persistent catalog, loading every stored record
    pub fn open(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let storage = PersistentStorage::open(path)?;
        let records = storage.scan_records()?;

        let mut store = Self::new();
        store.next_id = storage.next_id()?;
        for record in records {
            store.index.insert(record.id, store.records.len());
            store.records.push(record);
        }
        info!("Loaded {} graph records from {}", store.records.len(), storage.path());

        store.storage = Some(storage);
        Ok(store)
    }

    pub fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn all(&self) -> &[GraphRecord] {
        &self.records
    }

    pub fn get(&self, id: GraphId) -> Option<&GraphRecord> {
        self.index.get(&id).map(|&pos| &self.records[pos])
    }

    pub fn get_by_file_name(&self, file_name: &str) -> Option<&GraphRecord> {
        self.records.iter().find(|r| r.file_name == file_name)
    }

    /// Add a record and return its id
    pub fn insert(&mut self, graph: NewGraph, payload: Option<Vec<u8>>) -> CatalogResult<GraphId> {
        validate_file_name(&graph.file_name).map_err(|reason| CatalogError::InvalidRecord(reason.to_string()))?;

        let id = GraphId::new(self.next_id);
        let record = graph.into_record(id, Utc::now(), payload);

        if let Some(storage) = &self.storage {
            storage.put_record(&record)?;
            if let Some(payload) = &record.payload {
                storage.put_payload(id, payload)?;
            }
        }

        debug!("Inserted {} ({})", id, record.file_name);
        self.next_id += 1;
        self.index.insert(id, self.records.len());
        self.records.push(record);
        Ok(id)
    }

    /// Replace (or clear) a record's payload
    pub fn upsert_payload(&mut self, id: GraphId, payload: Option<Vec<u8>>) -> CatalogResult<()> {
        let pos = *self.index.get(&id).ok_or(CatalogError::NotFound(id))?;
        if let Some(storage) = &self.storage {
            match &payload {
                Some(bytes) => storage.put_payload(id, bytes)?,
                None => storage.delete_payload(id)?,
            }
        }
        self.records[pos].payload = payload;
        Ok(())
    }

    /// Apply `edit` to a copy of a stored record, write it (and its payload)
    /// through, then replace the stored record
    ///
    /// On error the stored record is unchanged.
    pub fn update<F>(&mut self, id: GraphId, edit: F) -> CatalogResult<&GraphRecord>
    where
        F: FnOnce(&mut GraphRecord),
    {
        let pos = *self.index.get(&id).ok_or(CatalogError::NotFound(id))?;
        let mut record = self.records[pos].clone();
        edit(&mut record);
        // the id is the storage key
        record.id = id;
        validate_file_name(&record.file_name).map_err(|reason| CatalogError::InvalidRecord(reason.to_string()))?;

        if let Some(storage) = &self.storage {
            storage.put_record(&record)?;
            match &record.payload {
                Some(bytes) => storage.put_payload(id, bytes)?,
                None => storage.delete_payload(id)?,
            }
        }
        self.records[pos] = record;
        Ok(&self.records[pos])
    }

    /// Every matching record, payload included, in store order
    pub fn find(&self, query: &CatalogQuery) -> Vec<GraphRecord> {
        self.records.iter().filter(|r| query.matches(r)).cloned().collect()
    }

    /// Every matching record without its payload, in store order
    pub fn find_summaries(&self, query: &CatalogQuery) -> Vec<GraphRecord> {
        self.records
            .iter()
            .filter(|r| query.matches(r))
            .map(GraphRecord::without_payload)
            .collect()
    }

    /// Fill in each record's stored payload. Unknown ids keep `None`.
    pub fn with_payloads(&self, mut records: Vec<GraphRecord>) -> Vec<GraphRecord> {
        for record in &mut records {
            record.payload = self.get(record.id).and_then(|stored| stored.payload.clone());
        }
        records
    }

    pub fn count(&self, query: &CatalogQuery) -> usize {
        self.records.iter().filter(|r| query.matches(r)).count()
    }

    /// One page of matching records without payloads. Pages are 1-based.
    pub fn page(&self, query: &CatalogQuery, page: usize, limit: usize) -> Page {
        let limit = if limit == 0 { DEFAULT_PAGE_LIMIT } else { limit };
        let page = page.max(1);
        let total_records = self.count(query);

        let graphs = self
            .records
            .iter()
            .filter(|r| query.matches(r))
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .map(GraphRecord::without_payload)
            .collect();

        Page {
            graphs,
            total_pages: total_records.div_ceil(limit),
            total_records,
            current_page: page,
        }
    }

    /// Flush persistent storage, if any
    pub fn flush(&self) -> CatalogResult<()> {
        if let Some(storage) = &self.storage {
            storage.flush()?;
        }
        Ok(())
    }
}
