//! Sorted-axis index implementation.

use rayon::prelude::*;
use umi_vector::{
    validate_batch, FlatIndex, IdSelector, Label, Metric, Result, SearchResults, VectorError,
    VectorIndex, NO_LABEL,
};

/// Populations at or above this size argsort on the rayon pool.
const PARALLEL_SORT_THRESHOLD: usize = 1_000_000;

/// Exact one-dimensional index answering queries through a sort
/// permutation.
///
/// The permutation is either rebuilt on every `add` (continuous update)
/// or deferred: `add` marks it stale and
/// [`update_permutation`](SortedAxisIndex::update_permutation) must run
/// before the next search. Searching through a stale permutation fails
/// with [`VectorError::InvariantViolation`]. An empty index is vacuously
/// sorted.
pub struct SortedAxisIndex {
    flat: FlatIndex,
    /// Positions into the store such that the values are non-decreasing.
    /// Valid only while `stale` is false.
    perm: Vec<usize>,
    stale: bool,
    continuous_update: bool,
}

impl SortedAxisIndex {
    /// Create an empty index. With `continuous_update` the permutation is
    /// recomputed after every `add` (O(n log n) each time); without it,
    /// batch the adds and call
    /// [`update_permutation`](SortedAxisIndex::update_permutation) once
    /// before searching.
    pub fn new(continuous_update: bool) -> Self {
        Self {
            flat: FlatIndex::new(1, Metric::L2),
            perm: Vec::new(),
            stale: false,
            continuous_update,
        }
    }

    /// Whether the permutation is stale and a search would fail.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Recompute the sort permutation unconditionally.
    pub fn update_permutation(&mut self) {
        let values = self.flat.vectors();
        let mut perm: Vec<usize> = (0..values.len()).collect();
        if perm.len() >= PARALLEL_SORT_THRESHOLD {
            perm.par_sort_unstable_by(|&a, &b| values[a].total_cmp(&values[b]));
        } else {
            perm.sort_unstable_by(|&a, &b| values[a].total_cmp(&values[b]));
        }

        self.perm = perm;
        self.stale = false;
        tracing::debug!(ntotal = self.flat.len(), "rebuilt sort permutation");
    }
}

impl VectorIndex for SortedAxisIndex {
    fn dimension(&self) -> usize {
        1
    }

    fn metric(&self) -> Metric {
        Metric::L2
    }

    fn len(&self) -> usize {
        self.flat.len()
    }

    fn add(&mut self, vectors: &[f32]) -> Result<()> {
        self.flat.add(vectors)?;
        if self.continuous_update {
            self.update_permutation();
        } else {
            self.stale = true;
        }
        Ok(())
    }

    fn search(&self, queries: &[f32], k: usize) -> Result<SearchResults> {
        if self.stale {
            return Err(VectorError::InvariantViolation(
                "sort permutation is stale; call update_permutation before searching".to_string(),
            ));
        }
        let num_queries = validate_batch(1, queries)?;
        if k == 0 {
            return Ok(SearchResults::new(0, Vec::new(), Vec::new()));
        }

        let n = self.flat.len();
        let values = self.flat.vectors();
        let perm = &self.perm;

        let mut distances = vec![f32::INFINITY; num_queries * k];
        let mut labels = vec![NO_LABEL; num_queries * k];

        queries
            .par_iter()
            .zip(distances.par_chunks_mut(k).zip(labels.par_chunks_mut(k)))
            .for_each(|(&q, (distance_row, label_row))| {
                if n == 0 {
                    return; // rows stay padded
                }

                // Split the sorted order into values <= q and values > q,
                // then expand outward taking the closer frontier. Ties go
                // to the left (lower-value) side.
                let split = perm.partition_point(|&p| values[p] <= q);
                let mut left = split;
                let mut right = split;

                for slot in 0..k {
                    let left_diff = if left > 0 {
                        q - values[perm[left - 1]]
                    } else {
                        f32::INFINITY
                    };
                    let right_diff = if right < n {
                        values[perm[right]] - q
                    } else {
                        f32::INFINITY
                    };

                    if left_diff <= right_diff && left_diff.is_finite() {
                        distance_row[slot] = left_diff;
                        label_row[slot] = perm[left - 1] as Label;
                        left -= 1;
                    } else if right_diff.is_finite() {
                        distance_row[slot] = right_diff;
                        label_row[slot] = perm[right] as Label;
                        right += 1;
                    } else {
                        break; // both frontiers exhausted; rest is padding
                    }
                }
            });

        Ok(SearchResults::new(k, distances, labels))
    }

    fn reconstruct(&self, label: Label) -> Result<Vec<f32>> {
        self.flat.reconstruct(label)
    }

    fn reconstruct_n(&self, first: Label, count: usize) -> Result<Vec<f32>> {
        self.flat.reconstruct_n(first, count)
    }

    fn remove_ids(&mut self, selector: &dyn IdSelector) -> Result<usize> {
        let removed = self.flat.remove_ids(selector)?;
        if removed > 0 {
            if self.continuous_update {
                self.update_permutation();
            } else {
                self.perm.clear();
                self.stale = !self.flat.is_empty();
            }
        }
        Ok(removed)
    }

    fn reset(&mut self) {
        self.flat.reset();
        self.perm.clear();
        self.stale = false;
    }
}
