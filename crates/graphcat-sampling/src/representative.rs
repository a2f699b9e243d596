//! Stratified (representative) sampling
//!
//! Each integer metric is split into equal-width bins over its observed range.
//! The bin indices of all metrics form a composite stratum key. The sample
//! budget is spread over occupied strata in proportion to their population,
//! so the sample's marginals track the candidate set's.
//!
//! Without a configured bin count, bins start at Sturges' rule and get coarser
//! until the occupied strata fit the sample budget.

use super::features::{FeatureMatrix, METRIC_DIM};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

/// Composite stratum key: one bin index per metric
pub type StratumKey = [usize; METRIC_DIM];

/// Representative sampler configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct RepresentativeConfig {
    /// Bins per metric. `None` picks a count from the candidate set size.
    pub bins: Option<usize>,
}

/// Sturges' rule, clamped to [2, 16]
pub fn default_bin_count(n: usize) -> usize {
    let n = n.max(1) as f64;
    (n.log2().ceil() as usize + 1).clamp(2, 16)
}

/// Bin index of `value` inside `[lo, hi]` split into `bins` equal-width bins.
///
/// A degenerate range (lo == hi) is a single bin.
pub fn bin_index(value: f64, lo: f64, hi: f64, bins: usize) -> usize {
    if bins <= 1 || hi <= lo {
        return 0;
    }
    let pos = ((value - lo) / (hi - lo) * bins as f64).floor();
    if pos <= 0.0 {
        0
    } else {
        (pos as usize).min(bins - 1)
    }
}

/// Group row indices by composite stratum key. Only occupied strata appear.
pub fn stratify(matrix: &FeatureMatrix, bins: usize) -> BTreeMap<StratumKey, Vec<usize>> {
    let ranges = matrix.column_ranges();
    let mut strata: BTreeMap<StratumKey, Vec<usize>> = BTreeMap::new();

    for i in 0..matrix.len() {
        let row = matrix.row(i);
        let mut key = [0usize; METRIC_DIM];
        for (j, slot) in key.iter_mut().enumerate() {
            let (lo, hi) = ranges[j];
            *slot = bin_index(row[j], lo, hi, bins);
        }
        strata.entry(key).or_default().push(i);
    }

    strata
}

/// Stratify with the finest bin count whose occupied strata number at most `k`
///
/// Starts at [`default_bin_count`] and stops at 2 bins even if the strata
/// still outnumber `k`.
pub fn fit_strata(matrix: &FeatureMatrix, k: usize) -> (usize, BTreeMap<StratumKey, Vec<usize>>) {
    let mut bins = default_bin_count(matrix.len());
    loop {
        let strata = stratify(matrix, bins);
        if strata.len() <= k || bins <= 2 {
            return (bins, strata);
        }
        bins -= 1;
    }
}

/// Split `k` across strata proportionally to `populations` (largest remainders).
///
/// The returned allocations sum to `min(k, total population)`. Remainder ties
/// go to the larger stratum, then to the earlier one.
pub fn allocate(populations: &[usize], k: usize) -> Vec<usize> {
    let total: usize = populations.iter().sum();
    if total == 0 {
        return vec![0; populations.len()];
    }
    if k >= total {
        return populations.to_vec();
    }

    let (k128, total128) = (k as u128, total as u128);
    let mut alloc = Vec::with_capacity(populations.len());
    let mut remainders = Vec::with_capacity(populations.len());
    for (i, &p) in populations.iter().enumerate() {
        let share = k128 * p as u128;
        alloc.push((share / total128) as usize);
        remainders.push((share % total128, p, i));
    }

    let assigned: usize = alloc.iter().sum();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));
    for &(_, _, i) in remainders.iter().take(k - assigned) {
        alloc[i] += 1;
    }

    alloc
}

/// Select `k` row indices so that every metric's distribution is approximated.
///
/// When there are more occupied strata than `k`, the `k` most populous strata
/// contribute one record each (ties broken at random). Otherwise each stratum
/// receives its proportional share drawn uniformly at random.
pub fn sample_indices<R: Rng + ?Sized>(
    matrix: &FeatureMatrix,
    k: usize,
    config: &RepresentativeConfig,
    rng: &mut R,
) -> Vec<usize> {
    let n = matrix.len();
    if k >= n {
        return (0..n).collect();
    }
    if k == 0 {
        return Vec::new();
    }

    let (bins, strata) = match config.bins {
        Some(bins) => (bins.max(1), stratify(matrix, bins.max(1))),
        None => fit_strata(matrix, k),
    };
    let mut strata: Vec<(StratumKey, Vec<usize>)> = strata.into_iter().collect();

    tracing::debug!(
        "representative sampling: n={}, k={}, bins={}, strata={}",
        n,
        k,
        bins,
        strata.len()
    );

    if strata.len() > k {
        strata.shuffle(rng);
        strata.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
        return strata
            .iter()
            .take(k)
            .filter_map(|(_, members)| members.choose(rng).copied())
            .collect();
    }

    let populations: Vec<usize> = strata.iter().map(|(_, members)| members.len()).collect();
    let allocation = allocate(&populations, k);

    let mut picked = Vec::with_capacity(k);
    for ((_, members), take) in strata.iter().zip(allocation) {
        if take == 0 {
            continue;
        }
        let chosen = rand::seq::index::sample(rng, members.len(), take);
        picked.extend(chosen.iter().map(|pos| members[pos]));
    }
    picked
}
