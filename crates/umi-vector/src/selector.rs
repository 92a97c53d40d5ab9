//! Bounded top-k selection over a candidate stream.
//!
//! Keeps the `k` best (distance, label) pairs seen during a scan without
//! sorting the full candidate set. The comparison polarity comes from
//! [`Metric::beats`], so one heap serves both metrics: for L2 the root
//! holds the largest kept distance, for inner product the smallest kept
//! score — either way, the root is the entry a new candidate must beat to
//! get in.

use crate::distance::Metric;
use crate::traits::{Label, NO_LABEL};

/// Bounded selector for the `k` best candidates of a scan.
///
/// The slots start filled with the metric's worst-value sentinel and
/// [`NO_LABEL`], so a selector that sees fewer than `k` candidates drains
/// into a correctly padded result row.
#[derive(Debug, Clone)]
pub struct TopKSelector {
    metric: Metric,
    distances: Vec<f32>,
    labels: Vec<Label>,
}

impl TopKSelector {
    /// Create a selector with `k` sentinel-filled slots.
    pub fn new(k: usize, metric: Metric) -> Self {
        Self {
            metric,
            distances: vec![metric.worst(); k],
            labels: vec![NO_LABEL; k],
        }
    }

    /// Seed a selector from an unsorted candidate list: the first
    /// `min(k, len)` pairs are heapified in O(k), the remainder inserted
    /// one by one. This is the merge entry point used by rerank search.
    pub fn from_candidates(
        k: usize,
        metric: Metric,
        distances: &[f32],
        labels: &[Label],
    ) -> Self {
        debug_assert_eq!(distances.len(), labels.len());

        let mut selector = Self::new(k, metric);
        let seed = distances.len().min(k);
        selector.distances[..seed].copy_from_slice(&distances[..seed]);
        selector.labels[..seed].copy_from_slice(&labels[..seed]);
        selector.heapify();
        selector.extend(&distances[seed..], &labels[seed..]);
        selector
    }

    /// Capacity of the selector.
    pub fn k(&self) -> usize {
        self.distances.len()
    }

    /// Offer one candidate. Replaces the current worst kept entry iff the
    /// candidate strictly beats it; ties leave the kept entry in place.
    /// O(log k).
    #[inline]
    pub fn push(&mut self, distance: f32, label: Label) {
        if self.distances.is_empty() {
            return;
        }
        if self.metric.beats(distance, self.distances[0]) {
            self.distances[0] = distance;
            self.labels[0] = label;
            self.sift_down(0, self.distances.len());
        }
    }

    /// Offer a batch of candidates.
    pub fn extend(&mut self, distances: &[f32], labels: &[Label]) {
        debug_assert_eq!(distances.len(), labels.len());
        for (&distance, &label) in distances.iter().zip(labels) {
            self.push(distance, label);
        }
    }

    /// Drain into best-to-worst order: ascending distance for L2,
    /// descending score for inner product. O(k log k).
    pub fn into_sorted(mut self) -> (Vec<f32>, Vec<Label>) {
        for end in (1..self.distances.len()).rev() {
            self.distances.swap(0, end);
            self.labels.swap(0, end);
            self.sift_down(0, end);
        }
        (self.distances, self.labels)
    }

    fn heapify(&mut self) {
        let n = self.distances.len();
        for i in (0..n / 2).rev() {
            self.sift_down(i, n);
        }
    }

    // Heap invariant: no child beats its parent, i.e. the root is the
    // worst kept entry.
    fn sift_down(&mut self, mut node: usize, end: usize) {
        loop {
            let left = 2 * node + 1;
            if left >= end {
                break;
            }
            let mut worst = node;
            if self.metric.beats(self.distances[worst], self.distances[left]) {
                worst = left;
            }
            let right = left + 1;
            if right < end && self.metric.beats(self.distances[worst], self.distances[right]) {
                worst = right;
            }
            if worst == node {
                break;
            }
            self.distances.swap(node, worst);
            self.labels.swap(node, worst);
            node = worst;
        }
    }
}
