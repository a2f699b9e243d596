//! Sampling engine for graph metric records
//!
//! Selects a bounded, duplicate-free, reproducible subset of candidates with
//! one of three strategies: uniform random, representative (stratified over
//! metric bins) or cluster-based (k-means over normalized feature vectors).

pub mod features;
pub mod random;
pub mod representative;
pub mod cluster;
pub mod engine;

pub use features::{Featurize, FeatureMatrix, FeatureVector, FEATURE_DIM, FEATURE_NAMES, METRIC_DIM};
pub use representative::{fit_strata, RepresentativeConfig, StratumKey};
pub use cluster::{ClusterError, ClusterResult, ClusteringOutcome, KMeansConfig};
pub use engine::{select, SamplingConfig, SamplingEngine, SamplingMethod, SamplingRequest, SamplingResult};
