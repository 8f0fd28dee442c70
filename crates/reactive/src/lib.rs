//! Lookout Reactive - Value observation over a Lookout store.
//!
//! This crate turns a computation over the store into a stream of values that
//! is re-evaluated whenever a commit touches what the computation read.
//!
//! # Core Concepts
//!
//! - `ValueObservation`: A computation plus its delivery policy
//! - `Observer`: Cancellation handle for a started observation
//! - `Event`: What the subscriber receives (value, failure, or completion)
//! - `Scheduler`: Execution context for evaluations and deliveries
//! - `ValueStream`: Blocking iterator adapter over an observation
//!
//! # Guarantees
//!
//! - Values are delivered in commit order, one evaluation at a time
//! - Commits that do not touch the tracked region cause no evaluation
//! - Commits arriving during an evaluation are coalesced into one catch-up
//! - No value is delivered after `Observer::cancel` returns
//!
//! # Example
//!
//! ```rust
//! use lookout_core::{Row, Value};
//! use lookout_reactive::ValueObservation;
//! use lookout_storage::{Store, TableSchema};
//! use std::time::Duration;
//!
//! let store = Store::in_memory();
//! store.create_table(TableSchema::new("players", ["id", "score"])).unwrap();
//!
//! let mut scores = ValueObservation::tracking(|tx| {
//!     let rows = tx.scan_columns("players", &["score"])?;
//!     Ok(rows.iter().filter_map(|row| row.get(0)?.as_i64()).sum::<i64>())
//! })
//! .values(&store);
//!
//! assert_eq!(scores.recv_timeout(Duration::from_secs(5)), Some(Ok(0)));
//!
//! store
//!     .write(|tx| tx.insert("players", Row::new(1, vec![Value::Int64(1), Value::Int64(42)])))
//!     .unwrap();
//! assert_eq!(scores.recv_timeout(Duration::from_secs(5)), Some(Ok(42)));
//! ```

pub mod observation;
pub mod scheduler;
pub mod stream;
pub mod subscription;

pub use observation::{Event, ObservationId, ValueObservation};
pub use scheduler::{InlineScheduler, Job, Scheduler, Scheduling, SerialQueue};
pub use stream::ValueStream;
pub use subscription::Observer;

// Re-export commonly used types from dependencies
pub use lookout_core::{Error, Result, TrackedRegion};
pub use lookout_storage::{ReadTransaction, Store};
