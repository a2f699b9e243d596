//! Cluster-based sampling
//!
//! Features are min-max normalized, partitioned with k-means (k-means++
//! seeding, Lloyd iterations under a hard cap) and each cluster contributes
//! the member nearest its centroid. Leftover budget is filled from the
//! largest clusters with the points farthest from everything already chosen.

use super::features::{squared_distance, FeatureMatrix};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

/// Clustering failures. These never escape the sampling facade.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("clustering needs at least 2 distinct feature vectors, found {0}")]
    Degenerate(usize),

    #[error("cluster count must be between 1 and {max}, got {requested}")]
    InvalidClusterCount { requested: usize, max: usize },
}

pub type ClusterResult<T> = Result<T, ClusterError>;

/// K-means configuration
#[derive(Debug, Clone, Copy)]
pub struct KMeansConfig {
    /// Hard cap on Lloyd iterations
    pub max_iterations: usize,
    /// Stop once no centroid moves farther than this
    pub tolerance: f64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

/// Result of a k-means run
#[derive(Debug, Clone)]
pub struct ClusteringOutcome {
    /// Cluster index for every row
    pub assignments: Vec<usize>,
    /// One centroid per row of this matrix
    pub centroids: Array2<f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl ClusteringOutcome {
    pub fn cluster_count(&self) -> usize {
        self.centroids.nrows()
    }

    /// Member row indices of every cluster (possibly empty)
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.cluster_count()];
        for (i, &c) in self.assignments.iter().enumerate() {
            members[c].push(i);
        }
        members
    }
}

fn nearest_centroid(point: ArrayView1<'_, f64>, centroids: &Array2<f64>) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (j, centroid) in centroids.axis_iter(Axis(0)).enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = j;
        }
    }
    best
}

/// k-means++ seeding: first centroid uniform, the rest with probability ∝ D².
fn kmeans_plus_plus_init<R: Rng + ?Sized>(
    points: &FeatureMatrix,
    clusters: usize,
    rng: &mut R,
) -> Array2<f64> {
    let n = points.len();
    let dim = points.data().ncols();
    let mut chosen = vec![rng.gen_range(0..n)];
    let mut min_dist: Vec<f64> = (0..n)
        .map(|i| squared_distance(points.row(i), points.row(chosen[0])))
        .collect();

    while chosen.len() < clusters {
        let next = match WeightedIndex::new(&min_dist) {
            Ok(dist) => dist.sample(rng),
            // every remaining point coincides with a centroid
            Err(_) => break,
        };
        chosen.push(next);
        for (i, d) in min_dist.iter_mut().enumerate() {
            *d = d.min(squared_distance(points.row(i), points.row(next)));
        }
    }

    let mut centroids = Array2::zeros((chosen.len(), dim));
    for (c, &idx) in chosen.iter().enumerate() {
        centroids.row_mut(c).assign(&points.row(idx));
    }
    centroids
}

/// Mean of assigned points. An empty cluster keeps its previous centroid.
fn recompute_centroids(points: &FeatureMatrix, assignments: &[usize], previous: &Array2<f64>) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros(previous.raw_dim());
    let mut counts = vec![0usize; previous.nrows()];

    for (i, &c) in assignments.iter().enumerate() {
        counts[c] += 1;
        let mut row = sums.row_mut(c);
        row += &points.row(i);
    }

    for (c, count) in counts.into_iter().enumerate() {
        if count == 0 {
            sums.row_mut(c).assign(&previous.row(c));
        } else {
            sums.row_mut(c).mapv_inplace(|v| v / count as f64);
        }
    }
    sums
}

/// Partition `points` into `clusters` groups.
pub fn kmeans<R: Rng + ?Sized>(
    points: &FeatureMatrix,
    clusters: usize,
    config: &KMeansConfig,
    rng: &mut R,
) -> ClusterResult<ClusteringOutcome> {
    let n = points.len();
    if clusters == 0 || clusters > n {
        return Err(ClusterError::InvalidClusterCount { requested: clusters, max: n });
    }

    let mut centroids = kmeans_plus_plus_init(points, clusters, rng);
    let mut assignments = vec![0usize; n];
    let mut iterations = 0;
    let mut converged = false;

    for _ in 0..config.max_iterations.max(1) {
        iterations += 1;

        assignments = (0..n)
            .into_par_iter()
            .map(|i| nearest_centroid(points.row(i), &centroids))
            .collect();

        let updated = recompute_centroids(points, &assignments, &centroids);
        let max_shift = updated
            .axis_iter(Axis(0))
            .zip(centroids.axis_iter(Axis(0)))
            .map(|(new, old)| squared_distance(new, old).sqrt())
            .fold(0.0f64, f64::max);
        centroids = updated;

        if max_shift < config.tolerance {
            converged = true;
            break;
        }
    }

    // final assignment against the settled centroids
    assignments = (0..n)
        .into_par_iter()
        .map(|i| nearest_centroid(points.row(i), &centroids))
        .collect();

    debug!(
        "k-means: n={}, clusters={}, iterations={}, converged={}",
        n,
        centroids.nrows(),
        iterations,
        converged
    );

    Ok(ClusteringOutcome {
        assignments,
        centroids,
        iterations,
        converged,
    })
}

/// Select `k` row indices spread across feature space.
///
/// Fails with [`ClusterError::Degenerate`] when fewer than two distinct
/// feature vectors exist; callers fall back to random sampling.
pub fn sample_indices<R: Rng + ?Sized>(
    matrix: &FeatureMatrix,
    k: usize,
    config: &KMeansConfig,
    rng: &mut R,
) -> ClusterResult<Vec<usize>> {
    let n = matrix.len();
    if k >= n {
        return Ok((0..n).collect());
    }
    if k == 0 {
        return Ok(Vec::new());
    }

    let points = matrix.normalized();
    let distinct = points.distinct_rows();
    if distinct < 2 {
        return Err(ClusterError::Degenerate(distinct));
    }

    let outcome = kmeans(&points, k.min(distinct), config, rng)?;
    let members = outcome.members();

    let mut order: Vec<usize> = (0..members.len()).filter(|&c| !members[c].is_empty()).collect();
    order.sort_by(|&a, &b| members[b].len().cmp(&members[a].len()));

    let mut taken = vec![false; n];
    let mut chosen = Vec::with_capacity(k);

    for &c in &order {
        let centroid = outcome.centroids.row(c);
        let medoid = members[c]
            .iter()
            .copied()
            .min_by(|&a, &b| {
                squared_distance(points.row(a), centroid)
                    .total_cmp(&squared_distance(points.row(b), centroid))
            });
        if let Some(idx) = medoid {
            taken[idx] = true;
            chosen.push(idx);
        }
    }

    if chosen.len() < k {
        fill_farthest(&points, &members, &order, &mut taken, &mut chosen, k);
    }

    Ok(chosen)
}

/// Top up `chosen` to `k` from the clusters with the most unpicked members,
/// each time taking the point farthest from all chosen points.
fn fill_farthest(
    points: &FeatureMatrix,
    members: &[Vec<usize>],
    order: &[usize],
    taken: &mut [bool],
    chosen: &mut Vec<usize>,
    k: usize,
) {
    let mut nearest_chosen: Array1<f64> = Array1::from_elem(points.len(), f64::INFINITY);
    for &c in chosen.iter() {
        update_nearest(points, &mut nearest_chosen, c);
    }

    let mut remaining: Vec<usize> = members
        .iter()
        .map(|m| m.iter().filter(|&&i| !taken[i]).count())
        .collect();

    while chosen.len() < k {
        // max_by_key keeps the last maximum; reversed scan favours larger clusters on ties
        let cluster = order
            .iter()
            .rev()
            .copied()
            .filter(|&c| remaining[c] > 0)
            .max_by_key(|&c| remaining[c]);
        let Some(cluster) = cluster else {
            break;
        };

        let pick = members[cluster]
            .iter()
            .copied()
            .filter(|&i| !taken[i])
            .fold(None, |best: Option<usize>, i| match best {
                Some(b) if nearest_chosen[b] >= nearest_chosen[i] => Some(b),
                _ => Some(i),
            });
        let Some(pick) = pick else {
            break;
        };

        taken[pick] = true;
        remaining[cluster] -= 1;
        chosen.push(pick);
        update_nearest(points, &mut nearest_chosen, pick);
    }
}

fn update_nearest(points: &FeatureMatrix, nearest: &mut Array1<f64>, picked: usize) {
    let anchor = points.row(picked);
    for (i, d) in nearest.iter_mut().enumerate() {
        *d = d.min(squared_distance(points.row(i), anchor));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn point(x: f64, y: f64) -> FeatureVector {
        [x, y, 0.0, 0.0, 0.0, 0.0, 0.0]
    }

    fn two_blobs() -> Vec<FeatureVector> {
        let mut rows = Vec::new();
        for i in 0..10 {
            rows.push(point(10.0 + i as f64 * 0.01, 10.0));
        }
        for i in 0..10 {
            rows.push(point(5000.0 + i as f64 * 0.01, 9000.0));
        }
        rows
    }

    #[test]
    fn test_kmeans_separates_blobs() {
        let matrix = FeatureMatrix::from_rows(&two_blobs()).normalized();
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = kmeans(&matrix, 2, &KMeansConfig::default(), &mut rng).unwrap();

        assert!(outcome.iterations <= 100);
        let first = outcome.assignments[0];
        assert!(outcome.assignments[..10].iter().all(|&c| c == first));
        assert!(outcome.assignments[10..].iter().all(|&c| c != first));
    }

    #[test]
    fn test_kmeans_rejects_bad_cluster_count() {
        let matrix = FeatureMatrix::from_rows(&two_blobs());
        let mut rng = StdRng::seed_from_u64(1);
        let err = kmeans(&matrix, 0, &KMeansConfig::default(), &mut rng).unwrap_err();
        assert_eq!(err, ClusterError::InvalidClusterCount { requested: 0, max: 20 });
    }

    #[test]
    fn test_one_pick_per_blob() {
        let matrix = FeatureMatrix::from_rows(&two_blobs());
        let mut rng = StdRng::seed_from_u64(9);
        let picked = sample_indices(&matrix, 2, &KMeansConfig::default(), &mut rng).unwrap();

        assert_eq!(picked.len(), 2);
        assert_eq!(picked.iter().filter(|&&i| i < 10).count(), 1);
        assert_eq!(picked.iter().filter(|&&i| i >= 10).count(), 1);
    }

    #[test]
    fn test_identical_vectors_are_degenerate() {
        let rows: Vec<FeatureVector> = (0..6).map(|_| point(4.0, 4.0)).collect();
        let matrix = FeatureMatrix::from_rows(&rows);
        let mut rng = StdRng::seed_from_u64(2);
        let err = sample_indices(&matrix, 3, &KMeansConfig::default(), &mut rng).unwrap_err();
        assert_eq!(err, ClusterError::Degenerate(1));
    }

    #[test]
    fn test_fill_when_fewer_distinct_points_than_k() {
        // three distinct locations, ten records, ask for five
        let mut rows = Vec::new();
        for i in 0..10 {
            let x = (i % 3) as f64 * 100.0;
            rows.push(point(x, x));
        }
        let matrix = FeatureMatrix::from_rows(&rows);
        let mut rng = StdRng::seed_from_u64(4);
        let picked = sample_indices(&matrix, 5, &KMeansConfig::default(), &mut rng).unwrap();

        assert_eq!(picked.len(), 5);
        let unique: HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 5);
        // every distinct location is represented
        let locations: HashSet<usize> = picked.iter().map(|&i| i % 3).collect();
        assert_eq!(locations.len(), 3);
    }

    #[test]
    fn test_seeded_reproducible() {
        let rows: Vec<FeatureVector> = (0..50)
            .map(|i| point((i * 37 % 101) as f64, (i * 13 % 53) as f64))
            .collect();
        let matrix = FeatureMatrix::from_rows(&rows);
        let a = sample_indices(&matrix, 7, &KMeansConfig::default(), &mut StdRng::seed_from_u64(8)).unwrap();
        let b = sample_indices(&matrix, 7, &KMeansConfig::default(), &mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(a, b);
    }
}
