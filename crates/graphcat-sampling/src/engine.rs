//! Sampling engine facade
//!
//! Dispatches a [`SamplingMethod`] to its sampler and applies the policy shared
//! by all of them: non-positive sizes and empty inputs give an empty result,
//! sizes at or above the candidate count give every candidate back untouched,
//! and clustering failures fall back to random sampling.

use super::cluster::{self, KMeansConfig};
use super::features::{FeatureMatrix, Featurize};
use super::random;
use super::representative::{self, RepresentativeConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Sampling strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "lowercase"))]
pub enum SamplingMethod {
    /// Uniform without replacement
    #[default]
    Random,
    /// Stratified over per-metric bins
    Representative,
    /// One pick per k-means cluster
    Cluster,
}

impl SamplingMethod {
    pub const ALL: [SamplingMethod; 3] = [
        SamplingMethod::Random,
        SamplingMethod::Representative,
        SamplingMethod::Cluster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingMethod::Random => "random",
            SamplingMethod::Representative => "representative",
            SamplingMethod::Cluster => "cluster",
        }
    }

    /// Resolve a method name. Unknown names resolve to `Random`.
    pub fn from_name(name: &str) -> Self {
        let trimmed = name.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(trimmed))
            .unwrap_or_else(|| {
                warn!("Unknown sampling method '{}', using random", name);
                SamplingMethod::Random
            })
    }
}

impl fmt::Display for SamplingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SamplingMethod {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

/// Any value is accepted: unknown names and non-string values resolve to `Random`.
#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for SamplingMethod {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Name(String),
            Other(serde::de::IgnoredAny),
        }

        match <Raw as serde::Deserialize>::deserialize(deserializer)? {
            Raw::Name(name) => Ok(Self::from_name(&name)),
            Raw::Other(_) => {
                warn!("Sampling method is not a name, using random");
                Ok(SamplingMethod::Random)
            }
        }
    }
}

/// Tuning knobs shared by every call of an engine
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct SamplingConfig {
    /// Bins per metric for representative sampling (None = fitted to the candidates and sample size)
    pub bins: Option<usize>,
    /// Lloyd iteration cap for cluster sampling
    pub max_iterations: usize,
    /// Centroid movement below which clustering stops early
    pub tolerance: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        let kmeans = KMeansConfig::default();
        Self {
            bins: None,
            max_iterations: kmeans.max_iterations,
            tolerance: kmeans.tolerance,
        }
    }
}

impl SamplingConfig {
    fn representative(&self) -> RepresentativeConfig {
        RepresentativeConfig { bins: self.bins }
    }

    fn kmeans(&self) -> KMeansConfig {
        KMeansConfig {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
        }
    }
}

/// One sampling call
#[derive(Debug, Clone)]
pub struct SamplingRequest<T> {
    pub candidates: Vec<T>,
    /// Requested size. Zero or negative yields an empty result.
    pub sample_size: i64,
    pub method: SamplingMethod,
    /// Fixed seed for reproducible selection; `None` draws fresh entropy
    pub seed: Option<u64>,
}

impl<T> SamplingRequest<T> {
    pub fn new(candidates: Vec<T>, sample_size: i64, method: SamplingMethod) -> Self {
        Self {
            candidates,
            sample_size,
            method,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Selected records, in selection order
#[derive(Debug, Clone)]
pub struct SamplingResult<T> {
    pub records: Vec<T>,
    /// Strategy that actually ran. `None` when the size policy answered
    /// without invoking any sampler.
    pub strategy: Option<SamplingMethod>,
}

impl<T> SamplingResult<T> {
    fn passthrough(records: Vec<T>) -> Self {
        Self { records, strategy: None }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }
}

/// Stateless sampling facade
#[derive(Debug, Clone, Default)]
pub struct SamplingEngine {
    config: SamplingConfig,
}

impl SamplingEngine {
    pub fn new(config: SamplingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Run the request through the size policy and the chosen sampler.
    pub fn select<T: Featurize>(&self, request: SamplingRequest<T>) -> SamplingResult<T> {
        let SamplingRequest {
            candidates,
            sample_size,
            method,
            seed,
        } = request;

        if sample_size <= 0 || candidates.is_empty() {
            return SamplingResult::passthrough(Vec::new());
        }
        let k = usize::try_from(sample_size).unwrap_or(usize::MAX);
        if k >= candidates.len() {
            return SamplingResult::passthrough(candidates);
        }

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let (indices, strategy) = self.select_indices(&candidates, k, method, &mut rng);

        let mut slots: Vec<Option<T>> = candidates.into_iter().map(Some).collect();
        let records: Vec<T> = indices
            .into_iter()
            .filter_map(|i| slots.get_mut(i).and_then(Option::take))
            .collect();

        debug!(
            "Sampled {} of {} candidates (requested {}, strategy {})",
            records.len(),
            slots.len(),
            method,
            strategy
        );

        SamplingResult {
            records,
            strategy: Some(strategy),
        }
    }

    /// Index-level dispatch for `0 < k < candidates.len()`.
    ///
    /// Returns the chosen indices and the strategy that produced them.
    pub fn select_indices<T: Featurize, R: Rng + ?Sized>(
        &self,
        candidates: &[T],
        k: usize,
        method: SamplingMethod,
        rng: &mut R,
    ) -> (Vec<usize>, SamplingMethod) {
        match method {
            SamplingMethod::Random => (
                random::sample_indices(candidates.len(), k, rng),
                SamplingMethod::Random,
            ),
            SamplingMethod::Representative => {
                let matrix = FeatureMatrix::from_candidates(candidates);
                (
                    representative::sample_indices(&matrix, k, &self.config.representative(), rng),
                    SamplingMethod::Representative,
                )
            }
            SamplingMethod::Cluster => {
                let matrix = FeatureMatrix::from_candidates(candidates);
                match cluster::sample_indices(&matrix, k, &self.config.kmeans(), rng) {
                    Ok(indices) => (indices, SamplingMethod::Cluster),
                    Err(e) => {
                        debug!("Cluster sampling fell back to random: {}", e);
                        (
                            random::sample_indices(candidates.len(), k, rng),
                            SamplingMethod::Random,
                        )
                    }
                }
            }
        }
    }
}

/// Select with the default engine configuration
pub fn select<T: Featurize>(request: SamplingRequest<T>) -> SamplingResult<T> {
    SamplingEngine::default().select(request)
}
