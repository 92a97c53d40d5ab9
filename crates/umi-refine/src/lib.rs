//! Two-stage exact-rerank search for Umi.
//!
//! A [`RefineIndex`] pairs a caller-supplied coarse index (any
//! `VectorIndex`, possibly approximate) with an internally owned exact
//! flat store over the same vectors. Queries fan out to the coarse index
//! for a widened candidate set, then the candidates are re-scored against
//! exact distances and the best `k` kept:
//!
//! ```text
//! query ──> coarse index ──> k_base candidate labels
//!                                  │ exact re-score
//!                            FlatIndex (owned, same vectors)
//!                                  │ merge top-k
//!                            ordered results
//! ```
//!
//! Only `k_base = round(k * k_factor)` exact evaluations are needed per
//! query, so an arbitrarily compressed coarse index is corrected to exact
//! distances at a small constant cost.
//!
//! # Example
//!
//! ```
//! use umi_refine::{RefineConfig, RefineIndex};
//! use umi_vector::{FlatIndex, Metric, VectorIndex};
//!
//! let coarse = FlatIndex::new(2, Metric::L2);
//! let mut index = RefineIndex::with_config(coarse, RefineConfig { k_factor: 2.0 }).unwrap();
//! index.add(&[0.0, 0.0, 1.0, 1.0]).unwrap();
//!
//! let results = index.search(&[0.9, 0.9], 1).unwrap();
//! assert_eq!(results.labels(0), &[1]);
//! ```

mod index;

pub use index::{RefineConfig, RefineIndex};
