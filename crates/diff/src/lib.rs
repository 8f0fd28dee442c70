//! Lookout Diff - Diffs between consecutive snapshots of a collection.
//!
//! Two algorithms are provided, both pure and deterministic:
//!
//! - `keyed_diff`: a single linear merge of two collections sorted by unique
//!   key, producing inserted, deleted, and updated elements
//! - `sequence_diff`: a minimal edit script of deletes and inserts between two
//!   ordered collections, with optional move detection via
//!   `EditScript::with_moves`
//!
//! `DiffScanner` folds a stream of snapshots into (collection, diff) pairs.
//! The first snapshot carries no diff.
//!
//! # Example
//!
//! ```rust
//! use lookout_diff::{DiffScanner, SequenceDiffer};
//!
//! let mut differ = SequenceDiffer::new(|a: &&str, b: &&str| a == b);
//! let scanner = DiffScanner::new(vec!["a", "b", "c"]);
//! assert!(scanner.diff().is_none());
//!
//! let scanner = scanner.scan(vec!["b", "c", "d"], &mut differ);
//! let script = scanner.diff().unwrap();
//! assert_eq!(script.apply(vec!["a", "b", "c"]), vec!["b", "c", "d"]);
//! ```

#![no_std]

extern crate alloc;

pub mod keyed;
pub mod scan;
pub mod sequence;

pub use keyed::{keyed_diff, keyed_diff_eq, KeyedDiff, Update};
pub use scan::{DiffScanner, Differ, KeyedDiffer, ScanDiffs, ScanDiffsExt, SequenceDiffer};
pub use sequence::{sequence_diff, Edit, EditScript};
