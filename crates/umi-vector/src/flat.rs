//! Brute-force flat index.
//!
//! Stores vectors in one contiguous row-major buffer and answers queries
//! by scanning every stored vector. O(n * d) per query, but exact — this
//! is the correctness baseline the rest of the index family is measured
//! against, and the rerank store composite indexes build on.

use crate::distance::Metric;
use crate::selector::TopKSelector;
use crate::traits::{
    validate_batch, IdSelector, Label, RangeSink, SearchResults, VectorIndex, NO_LABEL,
};
use crate::{Result, VectorError};
use rayon::prelude::*;

/// Brute-force exact index over a contiguous vector store.
///
/// Labels are insertion order; `remove_ids` compacts the store in place
/// and relabels survivors sequentially.
///
/// # Performance
///
/// - Add: O(n * d), amortized growth
/// - Search: O(ntotal * d) per query, parallel across the query batch
/// - Remove: O(ntotal * d) single compaction pass
pub struct FlatIndex {
    dimension: usize,
    metric: Metric,
    ntotal: usize,
    /// Concatenated rows, `ntotal * dimension` values.
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index for vectors of `dimension` (must be at least
    /// 1) under `metric`.
    pub fn new(dimension: usize, metric: Metric) -> Self {
        Self {
            dimension,
            metric,
            ntotal: 0,
            data: Vec::new(),
        }
    }

    /// Read-only view of the raw row-major store.
    pub fn vectors(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dimension..(i + 1) * self.dimension]
    }

    fn check_label(&self, label: Label) -> Result<usize> {
        if label < 0 || label as usize >= self.ntotal {
            return Err(VectorError::LabelOutOfRange {
                label,
                ntotal: self.ntotal,
            });
        }
        Ok(label as usize)
    }

    /// Exact metric values for given (query, label) pairs only — the
    /// sparse counterpart of a full scan, used by rerank search.
    ///
    /// `labels` holds `per_query` candidate labels per query, row-major.
    /// [`NO_LABEL`] entries yield the metric's worst-value sentinel so
    /// padded candidate rows flow through unchanged.
    ///
    /// # Errors
    ///
    /// Any label outside `[-1, ntotal)` is a contract violation by the
    /// caller and fails with `LabelOutOfRange`. The check is always on.
    pub fn compute_distance_subset(
        &self,
        queries: &[f32],
        labels: &[Label],
        per_query: usize,
    ) -> Result<Vec<f32>> {
        let num_queries = validate_batch(self.dimension, queries)?;
        if labels.len() != num_queries * per_query {
            return Err(VectorError::InvariantViolation(format!(
                "candidate list holds {} labels, expected {} queries x {}",
                labels.len(),
                num_queries,
                per_query
            )));
        }

        let mut distances = vec![0.0f32; labels.len()];
        for (query_index, query) in queries.chunks_exact(self.dimension).enumerate() {
            let row_start = query_index * per_query;
            for (slot, &label) in labels[row_start..row_start + per_query].iter().enumerate() {
                distances[row_start + slot] = if label == NO_LABEL {
                    self.metric.worst()
                } else {
                    let i = self.check_label(label)?;
                    self.metric.compute(query, self.row(i))
                };
            }
        }

        Ok(distances)
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn len(&self) -> usize {
        self.ntotal
    }

    fn add(&mut self, vectors: &[f32]) -> Result<()> {
        let n = validate_batch(self.dimension, vectors)?;
        self.data.extend_from_slice(vectors);
        self.ntotal += n;
        tracing::debug!(added = n, ntotal = self.ntotal, "appended vectors to flat store");
        Ok(())
    }

    fn search(&self, queries: &[f32], k: usize) -> Result<SearchResults> {
        let num_queries = validate_batch(self.dimension, queries)?;
        if k == 0 {
            return Ok(SearchResults::new(0, Vec::new(), Vec::new()));
        }

        let mut distances = vec![0.0f32; num_queries * k];
        let mut labels = vec![NO_LABEL; num_queries * k];

        // Queries are independent: scan state is private per query and the
        // store is only read.
        queries
            .par_chunks(self.dimension)
            .zip(distances.par_chunks_mut(k).zip(labels.par_chunks_mut(k)))
            .for_each(|(query, (distance_row, label_row))| {
                let mut selector = TopKSelector::new(k, self.metric);
                for (i, row) in self.data.chunks_exact(self.dimension).enumerate() {
                    selector.push(self.metric.compute(query, row), i as Label);
                }
                let (sorted_distances, sorted_labels) = selector.into_sorted();
                distance_row.copy_from_slice(&sorted_distances);
                label_row.copy_from_slice(&sorted_labels);
            });

        Ok(SearchResults::new(k, distances, labels))
    }

    fn range_search(&self, queries: &[f32], radius: f32, sink: &mut dyn RangeSink) -> Result<()> {
        validate_batch(self.dimension, queries)?;

        // Serial: the sink is external and appends must stay in query
        // order.
        for (query_index, query) in queries.chunks_exact(self.dimension).enumerate() {
            for (i, row) in self.data.chunks_exact(self.dimension).enumerate() {
                let value = self.metric.compute(query, row);
                if self.metric.within_radius(value, radius) {
                    sink.push(query_index, i as Label, value);
                }
            }
        }

        Ok(())
    }

    fn reconstruct(&self, label: Label) -> Result<Vec<f32>> {
        let i = self.check_label(label)?;
        Ok(self.row(i).to_vec())
    }

    fn reconstruct_n(&self, first: Label, count: usize) -> Result<Vec<f32>> {
        if first < 0 || first as usize + count > self.ntotal {
            return Err(VectorError::LabelOutOfRange {
                label: first + count as Label,
                ntotal: self.ntotal,
            });
        }
        let start = first as usize * self.dimension;
        Ok(self.data[start..start + count * self.dimension].to_vec())
    }

    fn remove_ids(&mut self, selector: &dyn IdSelector) -> Result<usize> {
        // Two-pointer compaction: survivors shift left over the gaps,
        // preserving order. copy_within handles the overlapping ranges.
        let d = self.dimension;
        let mut write = 0usize;
        for read in 0..self.ntotal {
            if selector.is_member(read as Label) {
                continue;
            }
            if read != write {
                self.data.copy_within(read * d..(read + 1) * d, write * d);
            }
            write += 1;
        }

        let removed = self.ntotal - write;
        if removed > 0 {
            self.ntotal = write;
            self.data.truncate(write * d);
            tracing::debug!(removed, ntotal = self.ntotal, "compacted flat store");
        }
        Ok(removed)
    }

    fn reset(&mut self) {
        self.data.clear();
        self.ntotal = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{LabelRange, RangeSearchResults};

    // Three vectors from the unit scenarios: label0=(0,0), label1=(2,0),
    // label2=(0,3).
    fn sample_index(metric: Metric) -> FlatIndex {
        let mut index = FlatIndex::new(2, metric);
        index.add(&[0.0, 0.0, 2.0, 0.0, 0.0, 3.0]).unwrap();
        index
    }

    #[test]
    fn test_l2_search() {
        let index = sample_index(Metric::L2);
        let results = index.search(&[0.0, 0.0], 2).unwrap();

        assert_eq!(results.labels(0), &[0, 1]);
        assert_eq!(results.distances(0), &[0.0, 4.0]);
    }

    #[test]
    fn test_inner_product_search() {
        let index = sample_index(Metric::InnerProduct);
        let results = index.search(&[1.0, 1.0], 2).unwrap();

        // Scores: label0=0, label1=2, label2=3, descending.
        assert_eq!(results.labels(0), &[2, 1]);
        assert_eq!(results.distances(0), &[3.0, 2.0]);
    }

    #[test]
    fn test_batch_search_is_per_query() {
        let index = sample_index(Metric::L2);
        let results = index.search(&[0.0, 0.0, 0.0, 3.0], 1).unwrap();

        assert_eq!(results.num_queries(), 2);
        assert_eq!(results.labels(0), &[0]);
        assert_eq!(results.labels(1), &[2]);
    }

    #[test]
    fn test_results_ordered_best_to_worst() {
        let mut index = FlatIndex::new(1, Metric::L2);
        index.add(&[9.0, 2.0, 7.0, 4.0, 0.0, 5.0]).unwrap();

        let results = index.search(&[3.0], 6).unwrap();
        let distances = results.distances(0);
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_padding_when_store_smaller_than_k() {
        let index = sample_index(Metric::L2);
        let results = index.search(&[0.0, 0.0], 5).unwrap();

        assert_eq!(&results.labels(0)[..3], &[0, 1, 2]);
        assert_eq!(&results.labels(0)[3..], &[NO_LABEL, NO_LABEL]);
        assert!(results.distances(0)[3..]
            .iter()
            .all(|d| *d == f32::INFINITY));
    }

    #[test]
    fn test_search_empty_index() {
        let index = FlatIndex::new(2, Metric::L2);
        let results = index.search(&[1.0, 2.0], 3).unwrap();
        assert_eq!(results.labels(0), &[NO_LABEL; 3]);
    }

    #[test]
    fn test_search_k_zero() {
        let index = sample_index(Metric::L2);
        let results = index.search(&[0.0, 0.0], 0).unwrap();
        assert_eq!(results.num_queries(), 0);
        assert!(results.labels_flat().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = FlatIndex::new(3, Metric::L2);
        assert!(matches!(
            index.add(&[1.0, 2.0]),
            Err(VectorError::DimensionMismatch { .. })
        ));

        index.add(&[1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(
            index.search(&[1.0, 2.0], 1),
            Err(VectorError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_non_finite_values() {
        let mut index = FlatIndex::new(2, Metric::L2);
        assert!(matches!(
            index.add(&[1.0, f32::NAN]),
            Err(VectorError::InvalidVector(_))
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_range_search_l2() {
        let index = sample_index(Metric::L2);
        let mut sink = RangeSearchResults::new();
        index.range_search(&[0.0, 0.0], 4.0, &mut sink).unwrap();

        // Distances 0, 4, 9; radius keeps values <= 4.
        let matches = sink.matches(0);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].label, 0);
        assert_eq!(matches[1].label, 1);
        assert_eq!(matches[1].distance, 4.0);
    }

    #[test]
    fn test_range_search_inner_product() {
        let index = sample_index(Metric::InnerProduct);
        let mut sink = RangeSearchResults::new();
        index.range_search(&[1.0, 1.0], 2.0, &mut sink).unwrap();

        // Scores 0, 2, 3; radius keeps values >= 2.
        let labels: Vec<Label> = sink.matches(0).iter().map(|m| m.label).collect();
        assert_eq!(labels, vec![1, 2]);
    }

    #[test]
    fn test_remove_ids_compacts_in_order() {
        let mut index = sample_index(Metric::L2);
        let removed = index.remove_ids(&|label: Label| label == 1).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(index.len(), 2);
        // Former labels 0 and 2 survive in that relative order.
        assert_eq!(index.reconstruct(0).unwrap(), vec![0.0, 0.0]);
        assert_eq!(index.reconstruct(1).unwrap(), vec![0.0, 3.0]);
    }

    #[test]
    fn test_remove_ids_with_label_range() {
        let mut index = FlatIndex::new(1, Metric::L2);
        index.add(&[0.0, 1.0, 2.0, 3.0, 4.0]).unwrap();

        let removed = index.remove_ids(&LabelRange { start: 1, end: 4 }).unwrap();
        assert_eq!(removed, 3);
        assert_eq!(index.vectors(), &[0.0, 4.0]);
    }

    #[test]
    fn test_remove_ids_no_match() {
        let mut index = sample_index(Metric::L2);
        let removed = index.remove_ids(&|_: Label| false).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_reconstruct() {
        let index = sample_index(Metric::L2);
        assert_eq!(index.reconstruct(1).unwrap(), vec![2.0, 0.0]);
        assert!(matches!(
            index.reconstruct(3),
            Err(VectorError::LabelOutOfRange { label: 3, .. })
        ));
        assert!(matches!(
            index.reconstruct(-1),
            Err(VectorError::LabelOutOfRange { .. })
        ));
    }

    #[test]
    fn test_reconstruct_n() {
        let index = sample_index(Metric::L2);
        assert_eq!(
            index.reconstruct_n(1, 2).unwrap(),
            vec![2.0, 0.0, 0.0, 3.0]
        );
        assert!(index.reconstruct_n(2, 2).is_err());
    }

    #[test]
    fn test_compute_distance_subset() {
        let index = sample_index(Metric::L2);
        let distances = index
            .compute_distance_subset(&[0.0, 0.0], &[2, NO_LABEL, 0], 3)
            .unwrap();

        assert_eq!(distances[0], 9.0);
        assert_eq!(distances[1], f32::INFINITY);
        assert_eq!(distances[2], 0.0);
    }

    #[test]
    fn test_compute_distance_subset_rejects_bad_label() {
        let index = sample_index(Metric::L2);
        assert!(matches!(
            index.compute_distance_subset(&[0.0, 0.0], &[7], 1),
            Err(VectorError::LabelOutOfRange { label: 7, .. })
        ));
    }

    #[test]
    fn test_assign_returns_labels_only() {
        let index = sample_index(Metric::L2);
        let labels = index.assign(&[0.0, 0.0, 0.0, 3.0], 1).unwrap();
        assert_eq!(labels, vec![0, 2]);
    }

    #[test]
    fn test_search_and_reconstruct() {
        let index = sample_index(Metric::L2);
        let (results, recons) = index.search_and_reconstruct(&[1.9, 0.0], 2).unwrap();

        assert_eq!(results.labels(0), &[1, 0]);
        assert_eq!(&recons[..2], &[2.0, 0.0]);
        assert_eq!(&recons[2..], &[0.0, 0.0]);
    }

    #[test]
    fn test_search_and_reconstruct_zeroes_padding() {
        let mut index = FlatIndex::new(2, Metric::L2);
        index.add(&[1.0, 1.0]).unwrap();

        let (results, recons) = index.search_and_reconstruct(&[0.0, 0.0], 2).unwrap();
        assert_eq!(results.labels(0), &[0, NO_LABEL]);
        assert_eq!(&recons[2..], &[0.0, 0.0]);
    }

    #[test]
    fn test_compute_residual() {
        let index = sample_index(Metric::L2);
        let residual = index.compute_residual(&[3.0, 1.0], 1).unwrap();
        assert_eq!(residual, vec![1.0, 1.0]);
    }

    #[test]
    fn test_add_with_labels_unsupported() {
        let mut index = FlatIndex::new(2, Metric::L2);
        assert!(matches!(
            index.add_with_labels(&[0.0, 0.0], &[5]),
            Err(VectorError::Unsupported(_))
        ));
    }

    #[test]
    fn test_reset() {
        let mut index = sample_index(Metric::L2);
        index.reset();
        assert!(index.is_empty());
        assert!(index.vectors().is_empty());

        // The index stays usable after a reset.
        index.add(&[1.0, 1.0]).unwrap();
        assert_eq!(index.len(), 1);
    }
}
