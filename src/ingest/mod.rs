//! Bulk import of graph metrics from CSV
//!
//! The metrics file has one row per graph:
//!
//! ```text
//! Filename,Number of Nodes,Number of Edges,Max Degree,Chromatic Number,Clique Number,Vertex Cover Size,Is Planar
//! petersen.graphml,10,15,3,3,2,6,False
//! ```
//!
//! The graph file itself is read from `<data_dir>/<Filename>`.

use crate::catalog::{validate_file_name, CatalogError, CatalogStore, GraphId, NewGraph};
use chrono::Utc;
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Ingestion errors
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Directory holding the graph files named in the CSV
    pub data_dir: Option<PathBuf>,
    /// Skip rows whose graph file is missing instead of importing them bare
    pub require_payload: bool,
}

impl IngestOptions {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            require_payload: false,
        }
    }

    pub fn require_payload(mut self, require: bool) -> Self {
        self.require_payload = require;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub updated: usize,
    /// Records whose graph file was not found (payload cleared)
    pub missing: usize,
}

#[derive(Debug, Deserialize)]
struct MetricsRow {
    #[serde(rename = "Filename")]
    file_name: String,
    #[serde(rename = "Number of Nodes")]
    num_nodes: u64,
    #[serde(rename = "Number of Edges")]
    num_edges: u64,
    #[serde(rename = "Max Degree")]
    max_degree: u64,
    #[serde(rename = "Chromatic Number")]
    chrom_num: u64,
    #[serde(rename = "Clique Number")]
    cli_num: u64,
    #[serde(rename = "Vertex Cover Size")]
    vertex_cover: u64,
    #[serde(rename = "Is Planar")]
    is_planar: String,
}

impl MetricsRow {
    fn into_new_graph(self) -> NewGraph {
        NewGraph {
            file_name: self.file_name,
            num_nodes: self.num_nodes,
            num_edges: self.num_edges,
            max_degree: self.max_degree,
            chrom_num: self.chrom_num,
            cli_num: self.cli_num,
            vertex_cover: self.vertex_cover,
            is_planar: self.is_planar.trim().eq_ignore_ascii_case("true"),
            graph_image: String::new(),
        }
    }
}

/// Read `<data_dir>/<file_name>`; a missing file is `None`
///
/// Names that would resolve outside `data_dir` are never read.
fn read_payload(data_dir: &Path, file_name: &str) -> io::Result<Option<Vec<u8>>> {
    if let Err(reason) = validate_file_name(file_name) {
        warn!("Not reading graph file {:?}: {}", file_name, reason);
        return Ok(None);
    }
    match fs::read(data_dir.join(file_name)) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Import every row of a metrics CSV into the catalog
///
/// Malformed rows are logged and counted in `failed`; they never abort the
/// import. Storage failures do.
pub fn import_csv<R: Read>(store: &mut CatalogStore, source: R, options: &IngestOptions) -> IngestResult<IngestReport> {
    let mut reader = ReaderBuilder::new().has_headers(true).trim(Trim::All).from_reader(source);
    let mut report = IngestReport::default();

    for (line, row) in reader.deserialize::<MetricsRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping malformed row {}: {}", line + 2, e);
                report.failed += 1;
                continue;
            }
        };

        let payload = match &options.data_dir {
            Some(dir) => match read_payload(dir, &row.file_name) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Cannot read graph file {}: {}", row.file_name, e);
                    report.failed += 1;
                    continue;
                }
            },
            None => None,
        };

        if payload.is_none() && options.require_payload {
            warn!("No graph file for {}, skipping", row.file_name);
            report.skipped += 1;
            continue;
        }

        match store.insert(row.into_new_graph(), payload) {
            Ok(id) => {
                debug!("Imported {}", id);
                report.imported += 1;
            }
            Err(CatalogError::InvalidRecord(reason)) => {
                warn!("Rejected row {}: {}", line + 2, reason);
                report.failed += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        "CSV import finished: {} imported, {} skipped, {} failed",
        report.imported, report.skipped, report.failed
    );
    Ok(report)
}

/// Import from a CSV file on disk
pub fn import_csv_file(
    store: &mut CatalogStore,
    path: impl AsRef<Path>,
    options: &IngestOptions,
) -> IngestResult<IngestReport> {
    let file = fs::File::open(path.as_ref())?;
    info!("Importing graph metrics from {}", path.as_ref().display());
    import_csv(store, file, options)
}

/// Re-read every record's graph file from `data_dir`
///
/// Also clears `graphImage` and stamps `dateAdded` with the current time.
pub fn refresh_payloads(store: &mut CatalogStore, data_dir: impl AsRef<Path>) -> IngestResult<RefreshReport> {
    let data_dir = data_dir.as_ref();
    let targets: Vec<(GraphId, String)> = store.all().iter().map(|r| (r.id, r.file_name.clone())).collect();
    let mut report = RefreshReport::default();
    let now = Utc::now();

    for (id, file_name) in targets {
        let payload = read_payload(data_dir, &file_name)?;
        if payload.is_none() {
            debug!("No graph file for {} ({})", id, file_name);
            report.missing += 1;
        }
        store.update(id, |record| {
            record.payload = payload;
            record.graph_image = String::new();
            record.date_added = Some(now);
        })?;
        report.updated += 1;
    }

    info!("Refreshed {} records ({} without graph file)", report.updated, report.missing);
    Ok(report)
}
