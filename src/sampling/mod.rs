//! Catalog sampling
//!
//! Glue between the catalog and the `graphcat-sampling` engine: filter the
//! catalog, then pick a sample of the matches.

pub use graphcat_sampling::{
    select, FeatureVector, Featurize, SamplingConfig, SamplingEngine, SamplingMethod, SamplingRequest,
    SamplingResult, FEATURE_NAMES,
};

use crate::catalog::{CatalogQuery, CatalogResult, CatalogStore, FilterSpec, GraphRecord};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Sample size used when a request does not give one
pub const DEFAULT_SAMPLE_SIZE: i64 = 100;

/// Body of a sample download request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SampleRequest {
    pub sample_size: Option<i64>,
    pub sampling_method: SamplingMethod,
    pub filters: FilterSpec,
    pub seed: Option<u64>,
}

impl SampleRequest {
    pub fn new(sample_size: i64, sampling_method: SamplingMethod) -> Self {
        Self {
            sample_size: Some(sample_size),
            sampling_method,
            ..Default::default()
        }
    }

    pub fn with_filters(mut self, filters: FilterSpec) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn size_or(&self, default_size: i64) -> i64 {
        self.sample_size.unwrap_or(default_size)
    }
}

/// Filter the catalog and sample the matching records
///
/// Only filter compilation can fail; sampling itself always produces a result.
pub fn sample_catalog(
    store: &CatalogStore,
    filters: &FilterSpec,
    sample_size: i64,
    method: SamplingMethod,
    seed: Option<u64>,
    config: &SamplingConfig,
) -> CatalogResult<SamplingResult<GraphRecord>> {
    let query = filters.compile()?;
    Ok(sample_matching(store, &query, sample_size, method, seed, config))
}

/// Sample the records matching a compiled query
///
/// Candidates are sampled without their payloads; only the selected records
/// get their graph files attached.
pub fn sample_matching(
    store: &CatalogStore,
    query: &CatalogQuery,
    sample_size: i64,
    method: SamplingMethod,
    seed: Option<u64>,
    config: &SamplingConfig,
) -> SamplingResult<GraphRecord> {
    let candidates = store.find_summaries(query);
    let matched = candidates.len();

    let mut request = SamplingRequest::new(candidates, sample_size, method);
    request.seed = seed;
    let mut result = SamplingEngine::new(*config).select(request);
    result.records = store.with_payloads(result.records);

    info!(
        "Sampled {} of {} matching graphs ({}, requested {})",
        result.len(),
        matched,
        method,
        sample_size
    );
    result
}
