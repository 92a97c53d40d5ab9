//! Refine index implementation.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use umi_vector::{
    validate_batch, FlatIndex, Label, Metric, Result, SearchResults, TopKSelector, VectorError,
    VectorIndex, NO_LABEL,
};

/// Rerank configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineConfig {
    /// Widening multiplier for the coarse pass: each search fetches
    /// `round(k * k_factor)` coarse candidates and reranks them exactly.
    /// Must be at least 1.0.
    /// Default: 1.0
    pub k_factor: f32,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self { k_factor: 1.0 }
    }
}

/// Index that reranks a coarse index's candidates with exact distances.
///
/// The composite owns the coarse index by value. To keep ownership of the
/// coarse index, pass `&mut coarse` (or a `Box<dyn VectorIndex>`) — the
/// blanket `VectorIndex` impls make both forms compose.
///
/// Vectors must flow into the composite through [`RefineIndex::add`] so
/// that label `i` means the same vector in both members; construction
/// therefore requires an empty coarse index.
pub struct RefineIndex<C> {
    coarse: C,
    exact: FlatIndex,
    k_factor: f32,
}

impl<C: VectorIndex> RefineIndex<C> {
    /// Compose with `k_factor = 1`.
    ///
    /// # Errors
    ///
    /// Fails if the coarse index is not empty.
    pub fn new(coarse: C) -> Result<Self> {
        Self::with_config(coarse, RefineConfig::default())
    }

    /// Compose with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Fails if the coarse index is not empty or `k_factor < 1.0`.
    pub fn with_config(coarse: C, config: RefineConfig) -> Result<Self> {
        if !coarse.is_empty() {
            return Err(VectorError::InvariantViolation(
                "coarse index must be empty when a refine index is composed".to_string(),
            ));
        }
        if !(config.k_factor >= 1.0) {
            return Err(VectorError::InvariantViolation(format!(
                "k_factor must be at least 1.0, got {}",
                config.k_factor
            )));
        }

        let exact = FlatIndex::new(coarse.dimension(), coarse.metric());
        Ok(Self {
            coarse,
            exact,
            k_factor: config.k_factor,
        })
    }

    /// Current widening multiplier.
    pub fn k_factor(&self) -> f32 {
        self.k_factor
    }

    /// The coarse member.
    pub fn coarse(&self) -> &C {
        &self.coarse
    }

    /// Mutable access to the coarse member, e.g. for tuning its search
    /// parameters. Adding or removing vectors through this handle breaks
    /// the label alignment the composite relies on.
    pub fn coarse_mut(&mut self) -> &mut C {
        &mut self.coarse
    }

    /// Dissolve the composite and hand the coarse member back.
    pub fn into_coarse(self) -> C {
        self.coarse
    }
}

impl<C: VectorIndex> VectorIndex for RefineIndex<C> {
    fn dimension(&self) -> usize {
        self.exact.dimension()
    }

    fn metric(&self) -> Metric {
        self.exact.metric()
    }

    fn len(&self) -> usize {
        self.exact.len()
    }

    fn is_trained(&self) -> bool {
        self.coarse.is_trained()
    }

    /// Training concerns only the coarse member; the exact store needs
    /// none.
    fn train(&mut self, vectors: &[f32]) -> Result<()> {
        self.coarse.train(vectors)
    }

    /// Appends to the coarse index and the exact store in lockstep, so
    /// both assign the same labels.
    fn add(&mut self, vectors: &[f32]) -> Result<()> {
        if !self.is_trained() {
            return Err(VectorError::NotTrained);
        }
        self.coarse.add(vectors)?;
        self.exact.add(vectors)?;
        Ok(())
    }

    fn search(&self, queries: &[f32], k: usize) -> Result<SearchResults> {
        if !self.is_trained() {
            return Err(VectorError::NotTrained);
        }
        let num_queries = validate_batch(self.dimension(), queries)?;
        if k == 0 {
            return Ok(SearchResults::new(0, Vec::new(), Vec::new()));
        }

        let k_base = ((k as f32 * self.k_factor).round() as usize).max(k);
        tracing::debug!(num_queries, k, k_base, "reranking coarse candidates");

        // The coarse distances are provisional and discarded; only the
        // labels survive into the rerank.
        let base = self.coarse.search(queries, k_base)?;
        let base_labels = base.labels_flat();

        // Hard-errors on any label outside [-1, ntotal): a coarse index
        // that emits one is violating its contract.
        let exact_distances = self
            .exact
            .compute_distance_subset(queries, base_labels, k_base)?;

        let mut distances = vec![0.0f32; num_queries * k];
        let mut labels = vec![NO_LABEL; num_queries * k];
        let metric = self.metric();

        distances
            .par_chunks_mut(k)
            .zip(labels.par_chunks_mut(k))
            .enumerate()
            .for_each(|(query_index, (distance_row, label_row))| {
                let row = query_index * k_base..(query_index + 1) * k_base;
                let selector = TopKSelector::from_candidates(
                    k,
                    metric,
                    &exact_distances[row.clone()],
                    &base_labels[row],
                );
                let (sorted_distances, sorted_labels) = selector.into_sorted();
                distance_row.copy_from_slice(&sorted_distances);
                label_row.copy_from_slice(&sorted_labels);
            });

        Ok(SearchResults::new(k, distances, labels))
    }

    /// Reconstruction is exact: it reads the owned flat store.
    fn reconstruct(&self, label: Label) -> Result<Vec<f32>> {
        self.exact.reconstruct(label)
    }

    fn reconstruct_n(&self, first: Label, count: usize) -> Result<Vec<f32>> {
        self.exact.reconstruct_n(first, count)
    }

    fn reset(&mut self) {
        self.coarse.reset();
        self.exact.reset();
    }
}
