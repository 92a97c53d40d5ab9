//! Core contract for vector indices.
//!
//! The [`VectorIndex`] trait defines the operation set shared by all index
//! types (flat, refine, sorted-axis, and future variants). Callers program
//! against the trait, never against a concrete type.
//!
//! Optional operations default to [`VectorError::Unsupported`], matching
//! the contract that only k-NN search, add and reset are mandatory.

use crate::{Metric, Result, VectorError};

/// Stable identifier for a stored vector. Default labeling is insertion
/// order, `0..ntotal`.
pub type Label = i64;

/// Sentinel label for result slots that carry no candidate.
pub const NO_LABEL: Label = -1;

/// Validate a row-major batch against the index dimension and return the
/// number of vectors it contains.
///
/// # Errors
///
/// Returns an error if:
/// - the batch length is not a multiple of `dimension`
/// - any component is NaN or infinite
pub fn validate_batch(dimension: usize, data: &[f32]) -> Result<usize> {
    if dimension == 0 {
        return Err(VectorError::InvalidVector(
            "dimension must be at least 1".to_string(),
        ));
    }
    if data.len() % dimension != 0 {
        return Err(VectorError::DimensionMismatch {
            expected: dimension,
            actual: data.len(),
        });
    }

    for (i, &v) in data.iter().enumerate() {
        if !v.is_finite() {
            return Err(VectorError::InvalidVector(format!(
                "non-finite value {} at offset {}",
                v, i
            )));
        }
    }

    Ok(data.len() / dimension)
}

/// Ordered k-NN results for a batch of queries.
///
/// Each query owns a row of exactly `k` (distance, label) pairs ordered
/// best-to-worst under the index metric: ascending distance for
/// [`Metric::L2`], descending score for [`Metric::InnerProduct`]. When an
/// index holds fewer than `k` vectors, trailing slots carry [`NO_LABEL`]
/// and the metric's worst-value sentinel as distance.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    k: usize,
    num_queries: usize,
    distances: Vec<f32>,
    labels: Vec<Label>,
}

impl SearchResults {
    /// Assemble results from flat row-major distance and label arrays of
    /// length `num_queries * k`.
    pub fn new(k: usize, distances: Vec<f32>, labels: Vec<Label>) -> Self {
        debug_assert_eq!(distances.len(), labels.len());
        let num_queries = if k == 0 { 0 } else { distances.len() / k };
        Self {
            k,
            num_queries,
            distances,
            labels,
        }
    }

    /// Results per query.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of queries in the batch.
    pub fn num_queries(&self) -> usize {
        self.num_queries
    }

    /// Distance row for one query, ordered best-to-worst.
    pub fn distances(&self, query: usize) -> &[f32] {
        &self.distances[query * self.k..(query + 1) * self.k]
    }

    /// Label row for one query, ordered best-to-worst.
    pub fn labels(&self, query: usize) -> &[Label] {
        &self.labels[query * self.k..(query + 1) * self.k]
    }

    /// All distances as one row-major slice.
    pub fn distances_flat(&self) -> &[f32] {
        &self.distances
    }

    /// All labels as one row-major slice.
    pub fn labels_flat(&self) -> &[Label] {
        &self.labels
    }

    /// Consume the results, keeping only the labels.
    pub fn into_labels(self) -> Vec<Label> {
        self.labels
    }
}

/// A single range-search match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeMatch {
    pub label: Label,
    pub distance: f32,
}

/// Append-only destination for range-search results, supplied by the
/// caller. Cardinality per query is variable, so results stream into the
/// sink instead of a fixed-size output.
pub trait RangeSink {
    /// Record that `label` matched `query` with metric value `distance`.
    fn push(&mut self, query: usize, label: Label, distance: f32);
}

/// Growable default [`RangeSink`] that groups matches per query.
#[derive(Debug, Clone, Default)]
pub struct RangeSearchResults {
    matches: Vec<Vec<RangeMatch>>,
}

impl RangeSearchResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queries that received at least one push.
    pub fn num_queries(&self) -> usize {
        self.matches.len()
    }

    /// Matches recorded for one query, in scan order.
    pub fn matches(&self, query: usize) -> &[RangeMatch] {
        self.matches.get(query).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl RangeSink for RangeSearchResults {
    fn push(&mut self, query: usize, label: Label, distance: f32) {
        if self.matches.len() <= query {
            self.matches.resize_with(query + 1, Vec::new);
        }
        self.matches[query].push(RangeMatch { label, distance });
    }
}

/// Caller-supplied predicate deciding which labels `remove_ids` drops.
///
/// The index calls it once per stored label, in label order.
pub trait IdSelector {
    fn is_member(&self, label: Label) -> bool;
}

impl<F: Fn(Label) -> bool> IdSelector for F {
    fn is_member(&self, label: Label) -> bool {
        self(label)
    }
}

/// Selects all labels in the half-open range `[start, end)`.
#[derive(Debug, Clone, Copy)]
pub struct LabelRange {
    pub start: Label,
    pub end: Label,
}

impl IdSelector for LabelRange {
    fn is_member(&self, label: Label) -> bool {
        label >= self.start && label < self.end
    }
}

/// Common interface for vector indices.
///
/// Mutation takes `&mut self` and search takes `&self`: the single-writer
/// contract is enforced by the borrow checker instead of internal locking.
/// Searches over a shared reference may safely run in parallel.
pub trait VectorIndex: Send + Sync {
    /// Dimension of stored vectors, fixed at construction.
    fn dimension(&self) -> usize;

    /// Metric this index searches under, fixed at construction.
    fn metric(&self) -> Metric;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    /// Whether the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the index is ready to accept vectors and queries. Indexes
    /// that need no training report `true` from the start.
    fn is_trained(&self) -> bool {
        true
    }

    /// Train on a representative batch. Default is a no-op; composite
    /// indexes delegate this to members that need it.
    fn train(&mut self, _vectors: &[f32]) -> Result<()> {
        Ok(())
    }

    /// Append a batch of vectors, assigning them the labels
    /// `len()..len() + n` in batch order.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch fails [`validate_batch`] or the index
    /// requires training that has not happened.
    fn add(&mut self, vectors: &[f32]) -> Result<()>;

    /// Append a batch with caller-supplied labels instead of sequential
    /// ones. Most indexes do not support this.
    fn add_with_labels(&mut self, _vectors: &[f32], _labels: &[Label]) -> Result<()> {
        Err(VectorError::Unsupported("add_with_labels"))
    }

    /// Find the `k` best-scoring stored vectors for each query.
    ///
    /// Pure with respect to the store: concurrent searches over `&self`
    /// are safe. `k == 0` yields an empty result.
    fn search(&self, queries: &[f32], k: usize) -> Result<SearchResults>;

    /// Stream every stored vector within `radius` of each query into
    /// `sink`. The radius comparison follows the metric polarity
    /// ([`Metric::within_radius`]). Optional per index variant.
    fn range_search(
        &self,
        _queries: &[f32],
        _radius: f32,
        _sink: &mut dyn RangeSink,
    ) -> Result<()> {
        Err(VectorError::Unsupported("range_search"))
    }

    /// Search variant returning only the result labels, row-major.
    fn assign(&self, queries: &[f32], k: usize) -> Result<Vec<Label>> {
        Ok(self.search(queries, k)?.into_labels())
    }

    /// Recover the stored vector for `label`. For lossy encodings this is
    /// an approximation; exact stores return the vector verbatim.
    fn reconstruct(&self, _label: Label) -> Result<Vec<f32>> {
        Err(VectorError::Unsupported("reconstruct"))
    }

    /// Recover `count` stored vectors starting at label `first`, as one
    /// row-major buffer.
    fn reconstruct_n(&self, first: Label, count: usize) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(count * self.dimension());
        for label in first..first + count as Label {
            out.extend_from_slice(&self.reconstruct(label)?);
        }
        Ok(out)
    }

    /// Search, then reconstruct each result vector. The second return
    /// value is a `num_queries * k * dimension` row-major buffer; rows for
    /// [`NO_LABEL`] padding slots stay zeroed.
    fn search_and_reconstruct(
        &self,
        queries: &[f32],
        k: usize,
    ) -> Result<(SearchResults, Vec<f32>)> {
        let results = self.search(queries, k)?;
        let d = self.dimension();
        let mut recons = vec![0.0f32; results.num_queries() * k * d];
        for (slot, &label) in results.labels_flat().iter().enumerate() {
            if label != NO_LABEL {
                recons[slot * d..(slot + 1) * d].copy_from_slice(&self.reconstruct(label)?);
            }
        }
        Ok((results, recons))
    }

    /// `x` minus the reconstruction of `label`; used by multi-stage
    /// schemes that encode residuals.
    fn compute_residual(&self, x: &[f32], label: Label) -> Result<Vec<f32>> {
        if x.len() != self.dimension() {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension(),
                actual: x.len(),
            });
        }
        let recons = self.reconstruct(label)?;
        Ok(x.iter().zip(recons.iter()).map(|(a, b)| a - b).collect())
    }

    /// Drop every stored vector whose label the selector claims, keeping
    /// the survivors in their original relative order. Returns the number
    /// removed. Surviving vectors are relabeled to stay sequential.
    fn remove_ids(&mut self, _selector: &dyn IdSelector) -> Result<usize> {
        Err(VectorError::Unsupported("remove_ids"))
    }

    /// Remove all stored vectors; `len()` becomes 0.
    fn reset(&mut self);
}

impl<T: VectorIndex + ?Sized> VectorIndex for &mut T {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn metric(&self) -> Metric {
        (**self).metric()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn is_trained(&self) -> bool {
        (**self).is_trained()
    }

    fn train(&mut self, vectors: &[f32]) -> Result<()> {
        (**self).train(vectors)
    }

    fn add(&mut self, vectors: &[f32]) -> Result<()> {
        (**self).add(vectors)
    }

    fn add_with_labels(&mut self, vectors: &[f32], labels: &[Label]) -> Result<()> {
        (**self).add_with_labels(vectors, labels)
    }

    fn search(&self, queries: &[f32], k: usize) -> Result<SearchResults> {
        (**self).search(queries, k)
    }

    fn range_search(&self, queries: &[f32], radius: f32, sink: &mut dyn RangeSink) -> Result<()> {
        (**self).range_search(queries, radius, sink)
    }

    fn reconstruct(&self, label: Label) -> Result<Vec<f32>> {
        (**self).reconstruct(label)
    }

    fn reconstruct_n(&self, first: Label, count: usize) -> Result<Vec<f32>> {
        (**self).reconstruct_n(first, count)
    }

    fn remove_ids(&mut self, selector: &dyn IdSelector) -> Result<usize> {
        (**self).remove_ids(selector)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

impl<T: VectorIndex + ?Sized> VectorIndex for Box<T> {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn metric(&self) -> Metric {
        (**self).metric()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn is_trained(&self) -> bool {
        (**self).is_trained()
    }

    fn train(&mut self, vectors: &[f32]) -> Result<()> {
        (**self).train(vectors)
    }

    fn add(&mut self, vectors: &[f32]) -> Result<()> {
        (**self).add(vectors)
    }

    fn add_with_labels(&mut self, vectors: &[f32], labels: &[Label]) -> Result<()> {
        (**self).add_with_labels(vectors, labels)
    }

    fn search(&self, queries: &[f32], k: usize) -> Result<SearchResults> {
        (**self).search(queries, k)
    }

    fn range_search(&self, queries: &[f32], radius: f32, sink: &mut dyn RangeSink) -> Result<()> {
        (**self).range_search(queries, radius, sink)
    }

    fn reconstruct(&self, label: Label) -> Result<Vec<f32>> {
        (**self).reconstruct(label)
    }

    fn reconstruct_n(&self, first: Label, count: usize) -> Result<Vec<f32>> {
        (**self).reconstruct_n(first, count)
    }

    fn remove_ids(&mut self, selector: &dyn IdSelector) -> Result<usize> {
        (**self).remove_ids(selector)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}
