//! Sorted one-dimensional index for Umi.
//!
//! [`SortedAxisIndex`] specializes the flat store for dimension 1. It
//! maintains a permutation of labels sorted by coordinate value, so a
//! query resolves by binary search plus outward frontier expansion in
//! O(log ntotal + k) instead of the flat index's O(ntotal) scan.
//!
//! Distances reported by `search` are absolute differences `|q - v|`,
//! which order identically to squared differences on one axis.
//!
//! # Example
//!
//! ```
//! use umi_axis::SortedAxisIndex;
//! use umi_vector::VectorIndex;
//!
//! let mut index = SortedAxisIndex::new(true);
//! index.add(&[5.0, 1.0, 3.0]).unwrap();
//!
//! let results = index.search(&[4.0], 2).unwrap();
//! assert_eq!(results.labels(0), &[2, 0]);
//! assert_eq!(results.distances(0), &[1.0, 1.0]);
//! ```

mod index;

pub use index::SortedAxisIndex;
