//! Lookout Storage - an in-memory versioned store with commit tracking.
//!
//! This crate provides the store collaborator the observation bridge relies on:
//!
//! - `Store`: serialized writes, snapshot reads, commit notification
//! - `Snapshot`: an immutable committed state at one version
//! - `ReadTransaction`: snapshot reads that record a `TrackedRegion`
//! - `WriteTransaction`: buffered writes with a `Journal`
//! - `Commit`: the version, snapshot and `ChangeSet` of one committed write
//!
//! It is not a query engine: reads are table scans and key lookups.
//!
//! # Example
//!
//! ```rust
//! use lookout_core::{Row, Value};
//! use lookout_storage::{observer_fn, Store, TableSchema};
//!
//! let store = Store::in_memory();
//! store.create_table(TableSchema::new("players", ["id", "score"])).unwrap();
//!
//! let _subscription = store
//!     .on_commit(observer_fn(|commit| {
//!         assert!(commit.changes().touches_table("players"));
//!     }))
//!     .unwrap();
//!
//! store
//!     .write(|tx| tx.insert("players", Row::new(1, vec![Value::Int64(1), Value::Int64(10)])))
//!     .unwrap();
//! ```

pub mod journal;
pub mod notify;
pub mod snapshot;
pub mod store;
pub mod table;
pub mod transaction;

pub use journal::{Journal, TableDiff};
pub use notify::{observer_fn, CommitObserver, HandlerId};
pub use snapshot::{Snapshot, Version};
pub use store::{Commit, CommitSubscription, Store, StoreConfig, WeakStore};
pub use table::{Table, TableSchema};
pub use transaction::{ReadTransaction, WriteTransaction};
