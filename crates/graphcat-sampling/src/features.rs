//! Feature vectors for graph metric records
//!
//! Every metric-aware sampler works on the same dense, index-addressed view of
//! the candidate set. The column order is fixed here and nowhere else.

use ndarray::{Array2, ArrayView1, Axis};
use std::collections::HashSet;

/// Number of coordinates in a feature vector
pub const FEATURE_DIM: usize = 7;

/// Number of leading coordinates that are integer metrics (the stratification axes)
pub const METRIC_DIM: usize = 6;

/// Column names, in vector order
pub const FEATURE_NAMES: [&str; FEATURE_DIM] = [
    "numNodes",
    "numEdges",
    "maxDegree",
    "chromNum",
    "cliNum",
    "vertexCover",
    "isPlanar",
];

/// Numeric embedding of one record: the six metrics followed by planarity as 0.0/1.0
pub type FeatureVector = [f64; FEATURE_DIM];

/// Anything the sampling engine can select from.
///
/// Implementations must be pure: the same record always yields the same vector.
pub trait Featurize {
    fn features(&self) -> FeatureVector;
}

impl Featurize for FeatureVector {
    fn features(&self) -> FeatureVector {
        *self
    }
}

impl<T: Featurize + ?Sized> Featurize for &T {
    fn features(&self) -> FeatureVector {
        (**self).features()
    }
}

/// A dense view of candidate features, one row per candidate.
///
/// Row `i` always refers to `candidates[i]`; samplers return row indices and
/// never own the records themselves.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    data: Array2<f64>,
}

impl FeatureMatrix {
    /// Extract features for every candidate, preserving input order
    pub fn from_candidates<T: Featurize>(candidates: &[T]) -> Self {
        let mut data = Array2::zeros((candidates.len(), FEATURE_DIM));
        for (i, candidate) in candidates.iter().enumerate() {
            for (j, value) in candidate.features().iter().enumerate() {
                data[[i, j]] = *value;
            }
        }
        Self { data }
    }

    /// Build directly from rows (test support)
    pub fn from_rows(rows: &[FeatureVector]) -> Self {
        Self::from_candidates(rows)
    }

    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    pub fn row(&self, idx: usize) -> ArrayView1<'_, f64> {
        self.data.row(idx)
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Observed (min, max) of each column. Empty matrices yield (0, 0).
    pub fn column_ranges(&self) -> Vec<(f64, f64)> {
        self.data
            .axis_iter(Axis(1))
            .map(|col| {
                if col.is_empty() {
                    return (0.0, 0.0);
                }
                col.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                })
            })
            .collect()
    }

    /// Min-max normalize every column into [0, 1].
    ///
    /// Columns with zero variance map to 0 so they never contribute distance.
    pub fn normalized(&self) -> FeatureMatrix {
        let ranges = self.column_ranges();
        let mut data = self.data.clone();
        for (j, mut col) in data.axis_iter_mut(Axis(1)).enumerate() {
            let (lo, hi) = ranges[j];
            let span = hi - lo;
            col.mapv_inplace(|v| if span > 0.0 { (v - lo) / span } else { 0.0 });
        }
        FeatureMatrix { data }
    }

    /// Number of distinct rows (bitwise, with -0.0 folded into 0.0)
    pub fn distinct_rows(&self) -> usize {
        let mut seen = HashSet::with_capacity(self.len());
        for row in self.data.axis_iter(Axis(0)) {
            let key: Vec<u64> = row.iter().map(|&v| (v + 0.0).to_bits()).collect();
            seen.insert(key);
        }
        seen.len()
    }
}

/// Squared Euclidean distance between two rows
pub fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
