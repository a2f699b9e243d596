//! Zip export of graph files
//!
//! Each record with a payload becomes one deflated archive entry named after
//! its `fileName`. Records without a payload are skipped.

use crate::catalog::GraphRecord;
use std::collections::HashSet;
use std::io::{self, Cursor, Seek, Write};
use thiserror::Error;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Download name for filter results
pub const FILTERED_ARCHIVE_NAME: &str = "filtered_graph_files.zip";
/// Download name for sample results
pub const SAMPLE_ARCHIVE_NAME: &str = "graph_sample.zip";

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Entries written
    pub written: usize,
    /// Records without a payload
    pub skipped: usize,
    /// Uncompressed payload bytes
    pub bytes: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct ArchiveExporter {
    level: i64,
}

impl Default for ArchiveExporter {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl ArchiveExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deflate level, clamped to 0..=9
    pub fn with_level(level: i64) -> Self {
        Self {
            level: level.clamp(0, 9),
        }
    }

    /// Write a zip of `records` into `writer`
    pub fn write<'a, I, W>(&self, records: I, writer: W) -> ExportResult<ExportSummary>
    where
        I: IntoIterator<Item = &'a GraphRecord>,
        W: Write + Seek,
    {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.level));

        let mut summary = ExportSummary::default();
        let mut names = HashSet::new();

        for record in records {
            let Some(payload) = record.payload.as_deref() else {
                debug!("{} has no graph file, not archived", record.id);
                summary.skipped += 1;
                continue;
            };

            let name = unique_name(&mut names, &entry_name(record), record.id.as_u64());

            zip.start_file(name, options)?;
            zip.write_all(payload)?;
            summary.written += 1;
            summary.bytes += payload.len() as u64;
        }

        zip.finish()?;
        info!(
            "Archived {} graph files ({} bytes), {} without file",
            summary.written, summary.bytes, summary.skipped
        );
        Ok(summary)
    }

    /// Build the archive in memory
    pub fn to_bytes<'a, I>(&self, records: I) -> ExportResult<(Vec<u8>, ExportSummary)>
    where
        I: IntoIterator<Item = &'a GraphRecord>,
    {
        let mut cursor = Cursor::new(Vec::new());
        let summary = self.write(records, &mut cursor)?;
        Ok((cursor.into_inner(), summary))
    }
}

/// Last path component of the record's `fileName`, so entries never carry
/// directories
fn entry_name(record: &GraphRecord) -> String {
    match record.file_name.rsplit(['/', '\\']).next().map(str::trim) {
        Some(base) if !base.is_empty() && base != "." && base != ".." => base.to_string(),
        _ => format!("graph-{}", record.id.as_u64()),
    }
}

/// First of `name`, `name-<id>`, `name-<id>-2`, ... not yet in `taken`
fn unique_name(taken: &mut HashSet<String>, name: &str, id: u64) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }
    let mut candidate = suffixed_name(name, &id.to_string());
    let mut counter = 2;
    while !taken.insert(candidate.clone()) {
        candidate = suffixed_name(name, &format!("{}-{}", id, counter));
        counter += 1;
    }
    candidate
}

/// `name.ext` -> `name-<suffix>.ext`
fn suffixed_name(file_name: &str, suffix: &str) -> String {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}-{}{}", &file_name[..dot], suffix, &file_name[dot..]),
        _ => format!("{}-{}", file_name, suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{GraphId, NewGraph};
    use chrono::Utc;
    use std::io::Read;
    use zip::ZipArchive;

    fn record(id: u64, name: &str, payload: Option<&str>) -> GraphRecord {
        NewGraph::new(name).into_record(GraphId::new(id), Utc::now(), payload.map(|p| p.as_bytes().to_vec()))
    }

    fn entries(bytes: Vec<u8>) -> Vec<(String, String)> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut content = String::new();
                file.read_to_string(&mut content).unwrap();
                (file.name().to_string(), content)
            })
            .collect()
    }

    #[test]
    fn test_entries_named_by_file_name() {
        let records = vec![
            record(1, "a.graphml", Some("<a/>")),
            record(2, "b.graphml", None),
            record(3, "c.graphml", Some("<c/>")),
        ];
        let (bytes, summary) = ArchiveExporter::new().to_bytes(&records).unwrap();
        assert_eq!(summary, ExportSummary { written: 2, skipped: 1, bytes: 8 });

        let entries = entries(bytes);
        assert_eq!(
            entries,
            vec![
                ("a.graphml".to_string(), "<a/>".to_string()),
                ("c.graphml".to_string(), "<c/>".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_archive_is_valid() {
        let (bytes, summary) = ArchiveExporter::new().to_bytes(&Vec::<GraphRecord>::new()).unwrap();
        assert_eq!(summary.written, 0);
        assert!(entries(bytes).is_empty());
    }

    #[test]
    fn test_duplicate_names_get_id_suffix() {
        let records = vec![
            record(1, "g.graphml", Some("one")),
            record(9, "g.graphml", Some("two")),
            record(4, "plain", Some("x")),
            record(5, "plain", Some("y")),
        ];
        let (bytes, _) = ArchiveExporter::with_level(1).to_bytes(&records).unwrap();
        let names: Vec<String> = entries(bytes).into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["g.graphml", "g-9.graphml", "plain", "plain-5"]);
    }

    #[test]
    fn test_suffix_never_reuses_a_taken_name() {
        let records = vec![
            record(3, "g-9.graphml", Some("three")),
            record(1, "g.graphml", Some("one")),
            record(9, "g.graphml", Some("nine")),
            record(7, "g-9.graphml", Some("seven")),
        ];
        let (bytes, summary) = ArchiveExporter::new().to_bytes(&records).unwrap();
        assert_eq!(summary.written, 4);

        let entries = entries(bytes);
        let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["g-9.graphml", "g.graphml", "g-9-2.graphml", "g-9-7.graphml"]);
        assert_eq!(entries[2].1, "nine");
    }

    #[test]
    fn test_entries_drop_directories() {
        let records = vec![
            record(1, "../x.graphml", Some("a")),
            record(2, "/etc/y.graphml", Some("b")),
            record(3, "dir\\z.graphml", Some("c")),
            record(4, "..", Some("d")),
            record(5, "nested/", Some("e")),
        ];
        let (bytes, _) = ArchiveExporter::new().to_bytes(&records).unwrap();
        let names: Vec<String> = entries(bytes).into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["x.graphml", "y.graphml", "z.graphml", "graph-4", "graph-5"]);
    }

    #[test]
    fn test_suffixed_name() {
        assert_eq!(suffixed_name("a.b.graphml", "3"), "a.b-3.graphml");
        assert_eq!(suffixed_name(".hidden", "3"), ".hidden-3");
    }
}
