//! Filter compilation
//!
//! Turns the user-facing filter document (per-metric min/max with strict or
//! inclusive operators, a case-insensitive file name pattern and a tri-state
//! planarity flag) into a `CatalogQuery` that the store evaluates per record.

use super::record::{GraphRecord, Metric};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Filter compilation errors
#[derive(Error, Debug, PartialEq)]
pub enum QueryError {
    #[error("Invalid bound for {field}: {value}")]
    InvalidBound { field: &'static str, value: f64 },

    #[error("Empty range for {field}: min {min} is greater than max {max}")]
    EmptyRange { field: &'static str, min: f64, max: f64 },

    #[error("Invalid file name pattern: {0}")]
    Pattern(String),
}

pub type QueryResult<T> = Result<T, QueryError>;

/// Whether a bound admits the bound value itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundKind {
    #[default]
    Inclusive,
    Strict,
}

impl BoundKind {
    /// `"<"` and `">"` are strict, anything else (`"<="`, `">="`, absent) inclusive
    pub fn from_operator(operator: Option<&str>) -> Self {
        match operator.map(str::trim) {
            Some("<") | Some(">") => BoundKind::Strict,
            _ => BoundKind::Inclusive,
        }
    }
}

/// Per-metric range as sent by clients
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeFilter {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Operator between `min` and the value
    pub operator1: Option<String>,
    /// Operator between the value and `max`
    pub operator2: Option<String>,
}

impl RangeFilter {
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            ..Default::default()
        }
    }

    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            ..Default::default()
        }
    }

    pub fn at_most(max: f64) -> Self {
        Self {
            max: Some(max),
            ..Default::default()
        }
    }

    pub fn strict(mut self) -> Self {
        self.operator1 = Some("<".to_string());
        self.operator2 = Some("<".to_string());
        self
    }
}

/// Tri-state planarity filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanarFilter {
    Planar,
    NonPlanar,
    #[default]
    Both,
}

impl PlanarFilter {
    /// `"true"` → planar, `"both"` or empty → unconstrained, any other text → non-planar
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        if text.eq_ignore_ascii_case("true") {
            PlanarFilter::Planar
        } else if text.is_empty() || text.eq_ignore_ascii_case("both") {
            PlanarFilter::Both
        } else {
            PlanarFilter::NonPlanar
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanarFilter::Planar => "true",
            PlanarFilter::NonPlanar => "false",
            PlanarFilter::Both => "both",
        }
    }

    fn required(&self) -> Option<bool> {
        match self {
            PlanarFilter::Planar => Some(true),
            PlanarFilter::NonPlanar => Some(false),
            PlanarFilter::Both => None,
        }
    }
}

impl Serialize for PlanarFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PlanarFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => PlanarFilter::Planar,
            Raw::Flag(false) => PlanarFilter::NonPlanar,
            Raw::Text(text) => PlanarFilter::from_text(&text),
        })
    }
}

/// Client filter document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    pub file_name: Option<String>,
    pub num_nodes: Option<RangeFilter>,
    pub num_edges: Option<RangeFilter>,
    pub max_degree: Option<RangeFilter>,
    pub chrom_num: Option<RangeFilter>,
    pub cli_num: Option<RangeFilter>,
    pub vertex_cover: Option<RangeFilter>,
    pub is_planar: Option<PlanarFilter>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(&self, metric: Metric) -> Option<&RangeFilter> {
        match metric {
            Metric::NumNodes => self.num_nodes.as_ref(),
            Metric::NumEdges => self.num_edges.as_ref(),
            Metric::MaxDegree => self.max_degree.as_ref(),
            Metric::ChromNum => self.chrom_num.as_ref(),
            Metric::CliNum => self.cli_num.as_ref(),
            Metric::VertexCover => self.vertex_cover.as_ref(),
        }
    }

    pub fn with_range(mut self, metric: Metric, range: RangeFilter) -> Self {
        let slot = match metric {
            Metric::NumNodes => &mut self.num_nodes,
            Metric::NumEdges => &mut self.num_edges,
            Metric::MaxDegree => &mut self.max_degree,
            Metric::ChromNum => &mut self.chrom_num,
            Metric::CliNum => &mut self.cli_num,
            Metric::VertexCover => &mut self.vertex_cover,
        };
        *slot = Some(range);
        self
    }

    pub fn with_file_name(mut self, pattern: impl Into<String>) -> Self {
        self.file_name = Some(pattern.into());
        self
    }

    pub fn with_planar(mut self, planar: PlanarFilter) -> Self {
        self.is_planar = Some(planar);
        self
    }

    /// Compile into an executable query
    pub fn compile(&self) -> QueryResult<CatalogQuery> {
        let file_name = match self.file_name.as_deref().map(str::trim) {
            Some(pattern) if !pattern.is_empty() => Some(compile_pattern(pattern)?),
            _ => None,
        };

        let mut ranges = Vec::new();
        for metric in Metric::ALL {
            if let Some(filter) = self.range(metric) {
                let range = MetricRange::compile(metric, filter)?;
                if !range.is_unbounded() {
                    ranges.push((metric, range));
                }
            }
        }

        Ok(CatalogQuery {
            file_name,
            ranges,
            is_planar: self.is_planar.and_then(|p| p.required()),
        })
    }
}

/// Case-insensitive pattern; falls back to a literal substring if it is not a valid regex
fn compile_pattern(pattern: &str) -> QueryResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .or_else(|_| RegexBuilder::new(&regex::escape(pattern)).case_insensitive(true).build())
        .map_err(|e| QueryError::Pattern(e.to_string()))
}

/// Compiled bounds for one metric
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricRange {
    pub lower: Option<(f64, BoundKind)>,
    pub upper: Option<(f64, BoundKind)>,
}

impl MetricRange {
    fn compile(metric: Metric, filter: &RangeFilter) -> QueryResult<Self> {
        let field = metric.json_name();
        for value in [filter.min, filter.max].into_iter().flatten() {
            if value.is_nan() {
                return Err(QueryError::InvalidBound { field, value });
            }
        }
        if let (Some(min), Some(max)) = (filter.min, filter.max) {
            if min > max {
                return Err(QueryError::EmptyRange { field, min, max });
            }
        }

        Ok(Self {
            lower: filter.min.map(|v| (v, BoundKind::from_operator(filter.operator1.as_deref()))),
            upper: filter.max.map(|v| (v, BoundKind::from_operator(filter.operator2.as_deref()))),
        })
    }

    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        let above = match self.lower {
            Some((min, BoundKind::Inclusive)) => value >= min,
            Some((min, BoundKind::Strict)) => value > min,
            None => true,
        };
        let below = match self.upper {
            Some((max, BoundKind::Inclusive)) => value <= max,
            Some((max, BoundKind::Strict)) => value < max,
            None => true,
        };
        above && below
    }
}

/// Executable catalog query
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    file_name: Option<Regex>,
    ranges: Vec<(Metric, MetricRange)>,
    is_planar: Option<bool>,
}

impl CatalogQuery {
    /// Query matching every record
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.file_name.is_none() && self.ranges.is_empty() && self.is_planar.is_none()
    }

    pub fn range(&self, metric: Metric) -> Option<&MetricRange> {
        self.ranges.iter().find(|(m, _)| *m == metric).map(|(_, r)| r)
    }

    pub fn matches(&self, record: &GraphRecord) -> bool {
        if let Some(planar) = self.is_planar {
            if record.is_planar != planar {
                return false;
            }
        }
        if !self
            .ranges
            .iter()
            .all(|(metric, range)| range.contains(record.metric(*metric) as f64))
        {
            return false;
        }
        match &self.file_name {
            Some(pattern) => pattern.is_match(&record.file_name),
            None => true,
        }
    }
}
