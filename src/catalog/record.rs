//! Catalog record model
//!
//! A `GraphRecord` is one cataloged graph: precomputed structural metrics plus
//! the raw graph file (payload). JSON uses the catalog's camelCase wire names;
//! the payload is never part of JSON and is stored apart from the record.

use chrono::{DateTime, Utc};
use graphcat_sampling::{FeatureVector, Featurize};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};

/// Catalog-assigned record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct GraphId(pub u64);

impl GraphId {
    pub fn new(id: u64) -> Self {
        GraphId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GraphId({})", self.0)
    }
}

impl From<u64> for GraphId {
    fn from(id: u64) -> Self {
        GraphId(id)
    }
}

/// The six integer metrics, in feature-vector order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    NumNodes,
    NumEdges,
    MaxDegree,
    ChromNum,
    CliNum,
    VertexCover,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::NumNodes,
        Metric::NumEdges,
        Metric::MaxDegree,
        Metric::ChromNum,
        Metric::CliNum,
        Metric::VertexCover,
    ];

    /// Field name on the wire
    pub fn json_name(&self) -> &'static str {
        match self {
            Metric::NumNodes => "numNodes",
            Metric::NumEdges => "numEdges",
            Metric::MaxDegree => "maxDegree",
            Metric::ChromNum => "chromNum",
            Metric::CliNum => "cliNum",
            Metric::VertexCover => "vertexCover",
        }
    }

    /// Column header in the metrics CSV
    pub fn csv_header(&self) -> &'static str {
        match self {
            Metric::NumNodes => "Number of Nodes",
            Metric::NumEdges => "Number of Edges",
            Metric::MaxDegree => "Max Degree",
            Metric::ChromNum => "Chromatic Number",
            Metric::CliNum => "Clique Number",
            Metric::VertexCover => "Vertex Cover Size",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.json_name())
    }
}

/// Check that `file_name` names one file directly inside the data directory
///
/// Returns the reason when it does not.
pub fn validate_file_name(file_name: &str) -> Result<(), &'static str> {
    if file_name.trim().is_empty() {
        return Err("fileName must not be empty");
    }
    if file_name.contains(['/', '\\', '\0']) {
        return Err("fileName must not contain path separators");
    }
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err("fileName must be a plain file name"),
    }
}

/// A cataloged graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRecord {
    pub id: GraphId,
    pub file_name: String,
    pub num_nodes: u64,
    pub num_edges: u64,
    pub max_degree: u64,
    pub chrom_num: u64,
    pub cli_num: u64,
    pub vertex_cover: u64,
    pub is_planar: bool,
    #[serde(default)]
    pub graph_image: String,
    #[serde(default)]
    pub date_added: Option<DateTime<Utc>>,
    /// Raw graph file (GraphML). Persisted separately, never serialized with the record.
    #[serde(skip)]
    pub payload: Option<Vec<u8>>,
}

impl GraphRecord {
    pub fn metric(&self, metric: Metric) -> u64 {
        match metric {
            Metric::NumNodes => self.num_nodes,
            Metric::NumEdges => self.num_edges,
            Metric::MaxDegree => self.max_degree,
            Metric::ChromNum => self.chrom_num,
            Metric::CliNum => self.cli_num,
            Metric::VertexCover => self.vertex_cover,
        }
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Copy of the record without its payload (for listings)
    pub fn without_payload(&self) -> GraphRecord {
        GraphRecord {
            id: self.id,
            file_name: self.file_name.clone(),
            num_nodes: self.num_nodes,
            num_edges: self.num_edges,
            max_degree: self.max_degree,
            chrom_num: self.chrom_num,
            cli_num: self.cli_num,
            vertex_cover: self.vertex_cover,
            is_planar: self.is_planar,
            graph_image: self.graph_image.clone(),
            date_added: self.date_added,
            payload: None,
        }
    }
}

impl Featurize for GraphRecord {
    fn features(&self) -> FeatureVector {
        [
            self.num_nodes as f64,
            self.num_edges as f64,
            self.max_degree as f64,
            self.chrom_num as f64,
            self.cli_num as f64,
            self.vertex_cover as f64,
            if self.is_planar { 1.0 } else { 0.0 },
        ]
    }
}

/// Insert payload for a new record (everything except the id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGraph {
    pub file_name: String,
    #[serde(default)]
    pub num_nodes: u64,
    #[serde(default)]
    pub num_edges: u64,
    #[serde(default)]
    pub max_degree: u64,
    #[serde(default)]
    pub chrom_num: u64,
    #[serde(default)]
    pub cli_num: u64,
    #[serde(default)]
    pub vertex_cover: u64,
    #[serde(default)]
    pub is_planar: bool,
    #[serde(default)]
    pub graph_image: String,
}

impl NewGraph {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            num_nodes: 0,
            num_edges: 0,
            max_degree: 0,
            chrom_num: 0,
            cli_num: 0,
            vertex_cover: 0,
            is_planar: false,
            graph_image: String::new(),
        }
    }

    pub fn with_metric(mut self, metric: Metric, value: u64) -> Self {
        match metric {
            Metric::NumNodes => self.num_nodes = value,
            Metric::NumEdges => self.num_edges = value,
            Metric::MaxDegree => self.max_degree = value,
            Metric::ChromNum => self.chrom_num = value,
            Metric::CliNum => self.cli_num = value,
            Metric::VertexCover => self.vertex_cover = value,
        }
        self
    }

    pub fn planar(mut self, is_planar: bool) -> Self {
        self.is_planar = is_planar;
        self
    }

    pub fn into_record(self, id: GraphId, date_added: DateTime<Utc>, payload: Option<Vec<u8>>) -> GraphRecord {
        GraphRecord {
            id,
            file_name: self.file_name,
            num_nodes: self.num_nodes,
            num_edges: self.num_edges,
            max_degree: self.max_degree,
            chrom_num: self.chrom_num,
            cli_num: self.cli_num,
            vertex_cover: self.vertex_cover,
            is_planar: self.is_planar,
            graph_image: self.graph_image,
            date_added: Some(date_added),
            payload,
        }
    }
}
