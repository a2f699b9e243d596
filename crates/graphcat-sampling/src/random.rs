//! Uniform random sampling without replacement

use rand::Rng;

/// Pick `k` distinct indices out of `0..n` uniformly at random.
///
/// When `k >= n` every index is returned in original order. Otherwise the
/// indices come back in draw order, which is itself random.
pub fn sample_indices<R: Rng + ?Sized>(n: usize, k: usize, rng: &mut R) -> Vec<usize> {
    if k >= n {
        return (0..n).collect();
    }
    rand::seq::index::sample(rng, n, k).into_vec()
}
