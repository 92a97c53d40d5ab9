//! Exact vector similarity search for Umi.
//!
//! This crate provides the core abstractions and the brute-force baseline
//! for vector similarity search:
//!
//! - **Metric kernels**: squared Euclidean distance and inner-product score
//! - **VectorIndex trait**: common interface for all index types
//! - **TopKSelector**: bounded best-k selection over a candidate stream
//! - **FlatIndex**: exact linear-scan search over a contiguous store
//!
//! # Architecture
//!
//! This crate is the foundation of Umi's index family:
//!
//! ```text
//! umi-vector::FlatIndex   (exact scan, the correctness baseline)
//!      ↑ exact store              ↑ 1-D store
//! umi-refine::RefineIndex   umi-axis::SortedAxisIndex
//! (rerank coarse candidates)  (binary search + frontier expansion)
//! ```
//!
//! # Data layout
//!
//! All bulk vector arguments are row-major `&[f32]` batches: a batch of
//! `n` vectors of dimension `d` is a flat slice of `n * d` values where
//! vector `i`'s component `j` sits at `i * d + j`.
//!
//! # Example
//!
//! ```
//! use umi_vector::{FlatIndex, Metric, VectorIndex};
//!
//! // Two-dimensional index under squared Euclidean distance.
//! let mut index = FlatIndex::new(2, Metric::L2);
//! index.add(&[0.0, 0.0, 2.0, 0.0, 0.0, 3.0]).unwrap();
//!
//! let results = index.search(&[0.0, 0.0], 2).unwrap();
//! assert_eq!(results.labels(0), &[0, 1]);
//! assert_eq!(results.distances(0), &[0.0, 4.0]);
//! ```

mod distance;
mod flat;
mod selector;
mod traits;

pub use distance::{inner_product, l2_squared, Metric};
pub use flat::FlatIndex;
pub use selector::TopKSelector;
pub use traits::{
    validate_batch, IdSelector, Label, LabelRange, RangeMatch, RangeSearchResults, RangeSink,
    SearchResults, VectorIndex, NO_LABEL,
};

/// Error type for vector-index operations.
#[derive(Debug, thiserror::Error)]
pub enum VectorError {
    #[error("expected {expected} values per vector, got a batch of {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid vector data: {0}")]
    InvalidVector(String),

    #[error("label {label} out of range for index with {ntotal} vectors")]
    LabelOutOfRange { label: Label, ntotal: usize },

    #[error("index must be trained before this operation")]
    NotTrained,

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("operation not supported by this index: {0}")]
    Unsupported(&'static str),
}

/// Result type for vector-index operations.
pub type Result<T> = std::result::Result<T, VectorError>;
