//! RocksDB storage for catalog records
//!
//! Records and payloads live in separate column families so listings and
//! recovery never touch the (large) graph files.

use super::record::{GraphId, GraphRecord};
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, DB};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

const RECORDS_CF: &str = "records";
const PAYLOADS_CF: &str = "payloads";

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB error
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Column family error
    #[error("Column family error: {0}")]
    ColumnFamily(String),

    /// Unusable storage path
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// RocksDB-based persistent catalog storage
pub struct PersistentStorage {
    db: Arc<DB>,
    path: String,
}

impl std::fmt::Debug for PersistentStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentStorage").field("path", &self.path).finish()
    }
}

impl PersistentStorage {
    /// Open or create storage at `path`
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path_str = path
            .as_ref()
            .to_str()
            .ok_or_else(|| StorageError::InvalidPath(path.as_ref().display().to_string()))?
            .to_string();

        info!("Opening catalog storage at: {}", path_str);

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_wal_recovery_mode(rocksdb::DBRecoveryMode::PointInTime);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new("default", Options::default()),
            ColumnFamilyDescriptor::new(RECORDS_CF, Self::record_cf_options()),
            ColumnFamilyDescriptor::new(PAYLOADS_CF, Self::payload_cf_options()),
        ];

        let db = DB::open_cf_descriptors(&opts, &path_str, cf_descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            path: path_str,
        })
    }

    fn record_cf_options() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    /// GraphML compresses well; favour ratio over speed
    fn payload_cf_options() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn cf(&self, name: &str) -> StorageResult<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamily(name.to_string()))
    }

    fn key(id: GraphId) -> [u8; 8] {
        id.as_u64().to_be_bytes()
    }

    /// Store a record (its payload is ignored; see `put_payload`)
    pub fn put_record(&self, record: &GraphRecord) -> StorageResult<()> {
        let cf = self.cf(RECORDS_CF)?;
        let value = bincode::serialize(record)?;
        self.db.put_cf(cf, Self::key(record.id), value)?;
        debug!("Stored record {}", record.id);
        Ok(())
    }

    /// Load a record without its payload
    pub fn get_record(&self, id: GraphId) -> StorageResult<Option<GraphRecord>> {
        let cf = self.cf(RECORDS_CF)?;
        match self.db.get_cf(cf, Self::key(id))? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Delete a record and its payload
    pub fn delete_record(&self, id: GraphId) -> StorageResult<()> {
        self.db.delete_cf(self.cf(RECORDS_CF)?, Self::key(id))?;
        self.db.delete_cf(self.cf(PAYLOADS_CF)?, Self::key(id))?;
        debug!("Deleted record {}", id);
        Ok(())
    }

    pub fn put_payload(&self, id: GraphId, payload: &[u8]) -> StorageResult<()> {
        self.db.put_cf(self.cf(PAYLOADS_CF)?, Self::key(id), payload)?;
        debug!("Stored {} payload bytes for {}", payload.len(), id);
        Ok(())
    }

    pub fn get_payload(&self, id: GraphId) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.db.get_cf(self.cf(PAYLOADS_CF)?, Self::key(id))?)
    }

    pub fn delete_payload(&self, id: GraphId) -> StorageResult<()> {
        self.db.delete_cf(self.cf(PAYLOADS_CF)?, Self::key(id))?;
        Ok(())
    }

    /// All records in id order, payloads attached (for recovery)
    pub fn scan_records(&self) -> StorageResult<Vec<GraphRecord>> {
        let cf = self.cf(RECORDS_CF)?;
        let mut records = Vec::new();

        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let mut record: GraphRecord = bincode::deserialize(&value)?;
            record.payload = self.get_payload(record.id)?;
            records.push(record);
        }

        Ok(records)
    }

    /// One past the highest stored id (1 for an empty catalog)
    pub fn next_id(&self) -> StorageResult<u64> {
        let cf = self.cf(RECORDS_CF)?;
        match self.db.iterator_cf(cf, IteratorMode::End).next() {
            Some(item) => {
                let (key, _value) = item?;
                let bytes: [u8; 8] = key
                    .as_ref()
                    .try_into()
                    .map_err(|_| StorageError::ColumnFamily(format!("malformed key in {}", RECORDS_CF)))?;
                Ok(u64::from_be_bytes(bytes) + 1)
            }
            None => Ok(1),
        }
    }

    /// Flush all data to disk
    pub fn flush(&self) -> StorageResult<()> {
        self.db.flush()?;
        debug!("Flushed storage to disk");
        Ok(())
    }
}
