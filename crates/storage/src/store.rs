//! The store: serialized writes, versioned snapshots and commit notification.
//!
//! Writers run one at a time. Each successful write publishes a new immutable
//! `Snapshot` and a `Commit` describing what it touched; registered
//! `CommitObserver`s are notified in commit order, on the committing thread,
//! before the next writer may start. Readers never block writers: they work on
//! whichever snapshot was current when they began.

use crate::notify::{CommitObserver, CommitRegistry, HandlerId};
use crate::snapshot::{Snapshot, Version};
use crate::table::TableSchema;
use crate::transaction::{ReadTransaction, WriteTransaction};
use lookout_core::{ChangeSet, Error, Result};
use parking_lot::Mutex;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace};

thread_local! {
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Name reported in log events.
    pub name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "lookout".to_owned(),
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with the given store name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One committed write transaction.
#[derive(Debug)]
pub struct Commit {
    version: Version,
    changes: ChangeSet,
    snapshot: Snapshot,
}

impl Commit {
    /// Returns the version this commit produced.
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the tables and columns the commit touched.
    #[inline]
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Returns the state right after this commit.
    #[inline]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

struct Published {
    current: Snapshot,
    registry: CommitRegistry,
}

struct StoreInner {
    config: StoreConfig,
    writer: Mutex<()>,
    published: Mutex<Published>,
    closed: AtomicBool,
}

impl StoreInner {
    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::StoreUnavailable);
        }
        Ok(())
    }

    fn shut_down(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let handlers = self.published.lock().registry.drain();
        info!(store = %self.config.name, handlers = handlers.len(), "store closed");
        for handler in handlers {
            handler.on_close();
        }
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        self.shut_down();
    }
}

/// Marks the current thread as dispatching commits until dropped.
struct DispatchGuard;

impl DispatchGuard {
    fn enter() -> Self {
        DISPATCHING.with(|d| d.set(true));
        DispatchGuard
    }

    fn active() -> bool {
        DISPATCHING.with(Cell::get)
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|d| d.set(false));
    }
}

/// An in-memory transactional store.
///
/// Cloning a `Store` yields another handle to the same store.
///
/// # Example
///
/// ```rust
/// use lookout_core::{Row, Value};
/// use lookout_storage::{Store, TableSchema};
///
/// let store = Store::in_memory();
/// store.create_table(TableSchema::new("players", ["id", "name"])).unwrap();
///
/// store
///     .write(|tx| tx.insert("players", Row::new(1, vec![Value::Int64(1), Value::from("Ann")])))
///     .unwrap();
///
/// let count = store.read(|tx| tx.count("players")).unwrap();
/// assert_eq!(count, 1);
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Creates an empty store.
    pub fn new(config: StoreConfig) -> Self {
        debug!(store = %config.name, "store opened");
        Self {
            inner: Arc::new(StoreInner {
                config,
                writer: Mutex::new(()),
                published: Mutex::new(Published {
                    current: Snapshot::new(0, BTreeMap::new()),
                    registry: CommitRegistry::new(),
                }),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Creates an empty store with the default configuration.
    pub fn in_memory() -> Self {
        Self::new(StoreConfig::default())
    }

    /// Returns the store name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Returns a handle that does not keep the store alive.
    pub fn downgrade(&self) -> WeakStore {
        WeakStore {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Creates a table.
    pub fn create_table(&self, schema: TableSchema) -> Result<()> {
        self.write(|tx| tx.create_table(schema))
    }

    /// Returns the latest committed snapshot.
    pub fn snapshot(&self) -> Result<Snapshot> {
        self.inner.check_open()?;
        Ok(self.inner.published.lock().current.clone())
    }

    /// Returns the latest committed version.
    pub fn version(&self) -> Result<Version> {
        self.snapshot().map(|s| s.version())
    }

    /// Starts a read transaction at the latest committed state.
    pub fn begin_read(&self) -> Result<ReadTransaction> {
        self.snapshot().map(|s| s.begin_read())
    }

    /// Runs a closure in a read transaction at the latest committed state.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut ReadTransaction) -> Result<T>,
    {
        let mut tx = self.begin_read()?;
        f(&mut tx)
    }

    /// Runs a closure in a write transaction.
    ///
    /// The transaction commits if the closure succeeds and rolls back if it
    /// fails. Commit handlers run before this method returns. Writing from
    /// inside a commit handler is an error, since the writer is still busy.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTransaction) -> Result<T>,
    {
        if DispatchGuard::active() {
            return Err(Error::invalid_operation(
                "cannot write to the store from a commit handler",
            ));
        }
        let _writer = self.inner.writer.lock();
        self.inner.check_open()?;

        let base = self.inner.published.lock().current.clone();
        let mut tx = WriteTransaction::begin(&base);
        let value = match f(&mut tx) {
            Ok(value) => value,
            Err(err) => {
                debug!(store = %self.name(), error = %err, "write rolled back");
                return Err(err);
            }
        };
        if tx.journal().is_empty() && !tx.has_schema_changes() {
            return Ok(value);
        }

        let (tables, journal) = tx.into_parts();
        let changes = journal.to_change_set(&tables);
        let version = base.version() + 1;
        let snapshot = Snapshot::new(version, tables);
        let handlers = {
            let mut published = self.inner.published.lock();
            published.current = snapshot.clone();
            published.registry.snapshot()
        };
        if changes.is_empty() {
            trace!(store = %self.name(), version, "schema committed");
            return Ok(value);
        }

        trace!(
            store = %self.name(),
            version,
            tables = changes.len(),
            handlers = handlers.len(),
            "commit"
        );
        let commit = Arc::new(Commit {
            version,
            changes,
            snapshot,
        });
        let _dispatch = DispatchGuard::enter();
        for handler in &handlers {
            handler.on_commit(&commit);
        }
        Ok(value)
    }

    /// Registers a commit handler.
    pub fn on_commit(&self, handler: Arc<dyn CommitObserver>) -> Result<CommitSubscription> {
        let mut published = self.inner.published.lock();
        self.inner.check_open()?;
        let id = published.registry.register(handler);
        Ok(self.subscription(id))
    }

    /// Registers a commit handler and returns the state it starts from.
    ///
    /// Registration and snapshot capture are atomic with respect to commits:
    /// every commit after the returned snapshot reaches the handler, and none
    /// before it does.
    pub fn observe_from_current(
        &self,
        handler: Arc<dyn CommitObserver>,
    ) -> Result<(CommitSubscription, Snapshot)> {
        let mut published = self.inner.published.lock();
        self.inner.check_open()?;
        let id = published.registry.register(handler);
        let snapshot = published.current.clone();
        Ok((self.subscription(id), snapshot))
    }

    fn subscription(&self, id: HandlerId) -> CommitSubscription {
        CommitSubscription {
            id,
            store: Arc::downgrade(&self.inner),
            active: AtomicBool::new(true),
        }
    }

    /// Returns the number of registered commit handlers.
    pub fn handler_count(&self) -> usize {
        self.inner.published.lock().registry.len()
    }

    /// Closes the store.
    ///
    /// Later reads and writes fail with `StoreUnavailable`, and every
    /// registered handler is told once through `on_close`.
    pub fn close(&self) {
        // A handler closing the store runs while the writer lock is held.
        let _writer = (!DispatchGuard::active()).then(|| self.inner.writer.lock());
        self.inner.shut_down();
    }

    /// Returns true once the store has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

/// A non-owning handle to a store.
#[derive(Clone)]
pub struct WeakStore {
    inner: Weak<StoreInner>,
}

impl WeakStore {
    /// Returns the store if it is still alive.
    pub fn upgrade(&self) -> Option<Store> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

/// Registration of a commit handler. Unregisters on `cancel` or drop.
pub struct CommitSubscription {
    id: HandlerId,
    store: Weak<StoreInner>,
    active: AtomicBool,
}

impl CommitSubscription {
    /// Returns the handler ID.
    #[inline]
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Returns whether the handler is still registered by this subscription.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Unregisters the handler. Calling it again has no effect.
    ///
    /// A commit already being dispatched may still reach the handler.
    pub fn cancel(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(inner) = self.store.upgrade() {
            inner.published.lock().registry.unregister(self.id);
        }
    }
}

impl Drop for CommitSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
