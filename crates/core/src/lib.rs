//! Lookout Core - values, rows, regions and change sets.
//!
//! This crate provides the types shared by the Lookout store and the
//! observation bridge:
//!
//! - `Value`: Runtime values that can be stored in a table cell
//! - `Row`: A row of values with a primary key and version
//! - `TrackedRegion`: The tables and columns a computation read
//! - `ChangeSet`: The tables and columns one commit touched
//! - `Error`: Error types for store access and observation
//!
//! # Example
//!
//! ```rust
//! use lookout_core::{ChangeSet, TrackedRegion};
//!
//! let mut region = TrackedRegion::new();
//! region.insert_columns("players", ["score"]);
//!
//! let mut changes = ChangeSet::new();
//! changes.record_update("players", ["name"]);
//! assert!(!region.intersects(&changes));
//!
//! changes.record_update("players", ["score"]);
//! assert!(region.intersects(&changes));
//! ```

mod change_set;
mod error;
mod region;
mod row;
mod value;

pub use change_set::{ChangeSet, TableChange};
pub use error::{Error, Result};
pub use region::{Columns, TrackedRegion};
pub use row::{Row, RowId};
pub use value::Value;
