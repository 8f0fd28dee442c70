//! Value observation: re-evaluating a computation whenever a commit touches
//! what it read.
//!
//! An observation evaluates its computation in a `ReadTransaction`, which
//! records the tables and columns it reads. Each later commit whose change set
//! intersects that region triggers a new evaluation against the commit's own
//! snapshot, and the result is delivered to the subscriber in commit order.
//!
//! Evaluations of one observation never overlap. Commits that arrive while an
//! evaluation is running are folded into one pending entry (the latest
//! snapshot plus the merged changes); when the evaluation ends, at most one
//! catch-up evaluation runs against that latest snapshot.

use crate::scheduler::{panic_message, Job, Scheduler, Scheduling};
use crate::stream::ValueStream;
use crate::subscription::{ObservationControl, Observer};
use lookout_core::{ChangeSet, Error, Result, TrackedRegion};
use lookout_storage::{Commit, CommitObserver, CommitSubscription, ReadTransaction, Snapshot, Store};
use parking_lot::{Mutex, ReentrantMutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Weak};
use tracing::{debug, trace, warn};

/// Unique identifier of an observation, used in log events.
pub type ObservationId = u64;

static NEXT_OBSERVATION_ID: AtomicU64 = AtomicU64::new(1);

/// What an observation reports to its subscriber.
#[derive(Clone, Debug, PartialEq)]
pub enum Event<T> {
    /// A freshly computed value.
    Value(T),
    /// The computation failed. No further events follow.
    Failed(Error),
    /// The store went away. No further events follow.
    Finished,
}

impl<T> Event<T> {
    /// Returns true for `Failed` and `Finished`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Event::Value(_))
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Event::Value(value) => Some(value),
            _ => None,
        }
    }
}

type Fetch<T> = Box<dyn FnMut(&mut ReadTransaction) -> Result<Option<T>> + Send>;
type Sink<T> = Box<dyn FnMut(Event<T>) + Send>;

/// A computation over the store, observed for changes.
///
/// # Example
///
/// ```rust
/// use lookout_core::{Row, Value};
/// use lookout_reactive::{Event, Scheduling, ValueObservation};
/// use lookout_storage::{Store, TableSchema};
/// use std::sync::{Arc, Mutex};
///
/// let store = Store::in_memory();
/// store.create_table(TableSchema::new("players", ["id", "score"])).unwrap();
///
/// let counts = Arc::new(Mutex::new(Vec::new()));
/// let seen = Arc::clone(&counts);
/// let observer = ValueObservation::tracking(|tx| tx.count("players"))
///     .scheduling(Scheduling::inline())
///     .start(&store, move |event| {
///         if let Event::Value(count) = event {
///             seen.lock().unwrap().push(count);
///         }
///     });
///
/// store
///     .write(|tx| tx.insert("players", Row::new(1, vec![Value::Int64(1), Value::Int64(10)])))
///     .unwrap();
/// observer.cancel();
///
/// assert_eq!(*counts.lock().unwrap(), vec![0, 1]);
/// ```
pub struct ValueObservation<T> {
    fetch: Fetch<T>,
    region: Option<TrackedRegion>,
    scheduling: Scheduling,
}

impl<T: Send + 'static> ValueObservation<T> {
    /// Observes the value `recompute` computes.
    ///
    /// `recompute` must be deterministic given the snapshot it reads. Only
    /// what it reads through the transaction is tracked.
    pub fn tracking<F>(mut recompute: F) -> Self
    where
        F: FnMut(&mut ReadTransaction) -> Result<T> + Send + 'static,
    {
        Self {
            fetch: Box::new(move |tx| recompute(tx).map(Some)),
            region: None,
            scheduling: Scheduling::default(),
        }
    }

    /// Transforms every value before it is delivered.
    ///
    /// `f` runs on the same context as the evaluation.
    pub fn map<U, G>(self, f: G) -> ValueObservation<U>
    where
        U: Send + 'static,
        G: Fn(T) -> U + Send + 'static,
    {
        let mut fetch = self.fetch;
        ValueObservation {
            fetch: Box::new(move |tx| Ok(fetch(tx)?.map(&f))),
            region: self.region,
            scheduling: self.scheduling,
        }
    }

    /// Tracks a fixed region instead of the one recorded from reads.
    pub fn tracking_region(mut self, region: TrackedRegion) -> Self {
        self.region = Some(region);
        self
    }

    /// Sets where evaluations and deliveries run.
    pub fn scheduling(mut self, scheduling: Scheduling) -> Self {
        self.scheduling = scheduling;
        self
    }

    /// Starts observing `store`.
    ///
    /// The observation stays alive as long as the returned `Observer`; drop
    /// or cancel it to stop. If the store is already closed, the subscriber
    /// receives `Event::Finished`.
    pub fn start<F>(self, store: &Store, on_event: F) -> Observer
    where
        F: FnMut(Event<T>) + Send + 'static,
    {
        let ValueObservation {
            fetch,
            region,
            scheduling,
        } = self;
        let immediate = scheduling.is_immediate();
        let id = NEXT_OBSERVATION_ID.fetch_add(1, Ordering::Relaxed);

        let shared = Arc::new_cyclic(|this| Shared {
            id,
            store: store.name().to_owned(),
            this: this.clone(),
            scheduler: Arc::clone(scheduling.scheduler()),
            fixed_region: region.is_some(),
            state: Mutex::new(State {
                region,
                // The initial evaluation counts as running
                running: true,
                closed: false,
                done: false,
                pending: None,
            }),
            fetch: Mutex::new(fetch),
            sink: Mutex::new(Box::new(on_event)),
            gate: ReentrantMutex::new(()),
            cancelled: AtomicBool::new(false),
            subscription: Mutex::new(None),
        });

        let handler: Arc<dyn CommitObserver> = shared.clone();
        match store.observe_from_current(handler) {
            Ok((subscription, snapshot)) => {
                *shared.subscription.lock() = Some(subscription);
                debug!(
                    observation = id,
                    store = %shared.store,
                    version = snapshot.version(),
                    immediate,
                    "observation started"
                );
                if immediate {
                    shared.evaluate(snapshot);
                } else {
                    shared.schedule(snapshot);
                }
            }
            Err(err) => {
                debug!(observation = id, store = %shared.store, error = %err, "store unavailable at start");
                shared.state.lock().closed = true;
                if immediate {
                    shared.terminate(Event::Finished);
                } else {
                    shared.spawn(|shared| shared.terminate(Event::Finished));
                }
            }
        }

        Observer::new(shared)
    }

    /// Starts observing `store` and returns a blocking iterator of values.
    pub fn values(self, store: &Store) -> ValueStream<T> {
        let (sender, receiver) = mpsc::channel();
        let observer = self.start(store, move |event| {
            // The stream may already be gone
            let _ = sender.send(event);
        });
        ValueStream::new(receiver, observer)
    }
}

impl<T: Clone + PartialEq + Send + 'static> ValueObservation<T> {
    /// Skips values equal to the previously delivered one.
    pub fn remove_duplicates(self) -> Self {
        let mut fetch = self.fetch;
        let mut last: Option<T> = None;
        Self {
            fetch: Box::new(move |tx| {
                let value = match fetch(tx)? {
                    Some(value) => value,
                    None => return Ok(None),
                };
                if last.as_ref() == Some(&value) {
                    return Ok(None);
                }
                last = Some(value.clone());
                Ok(Some(value))
            }),
            region: self.region,
            scheduling: self.scheduling,
        }
    }
}

/// Commits seen while an evaluation was running.
struct Pending {
    snapshot: Snapshot,
    changes: ChangeSet,
}

struct State {
    /// `None` until the first evaluation finishes
    region: Option<TrackedRegion>,
    running: bool,
    /// The store is gone; finish once idle
    closed: bool,
    /// Failed, finished, or cancelled
    done: bool,
    pending: Option<Pending>,
}

enum Next {
    Idle,
    CatchUp(Snapshot),
    Finish,
}

/// State shared by the observer handle, the store's handler registry, and
/// scheduled jobs.
struct Shared<T> {
    id: ObservationId,
    store: String,
    this: Weak<Shared<T>>,
    scheduler: Arc<dyn Scheduler>,
    fixed_region: bool,
    state: Mutex<State>,
    fetch: Mutex<Fetch<T>>,
    sink: Mutex<Sink<T>>,
    /// Held for every delivery; cancel waits on it
    gate: ReentrantMutex<()>,
    cancelled: AtomicBool,
    subscription: Mutex<Option<CommitSubscription>>,
}

impl<T: Send + 'static> Shared<T> {
    fn spawn<F>(&self, f: F)
    where
        F: FnOnce(&Shared<T>) + Send + 'static,
    {
        if let Some(this) = self.this.upgrade() {
            let job: Job = Box::new(move || f(&*this));
            self.scheduler.schedule(job);
        }
    }

    fn schedule(&self, snapshot: Snapshot) {
        self.spawn(move |shared| shared.evaluate(snapshot));
    }

    fn evaluate(&self, snapshot: Snapshot) {
        if self.state.lock().done {
            return;
        }
        let version = snapshot.version();
        let mut tx = snapshot.begin_read();
        // A panicking computation fails this observation only
        let result = {
            let mut fetch = self.fetch.lock();
            panic::catch_unwind(AssertUnwindSafe(|| (*fetch)(&mut tx))).unwrap_or_else(|payload| {
                Err(Error::recompute(format!(
                    "computation panicked: {}",
                    panic_message(payload.as_ref())
                )))
            })
        };

        match result {
            Ok(value) => {
                if !self.fixed_region {
                    self.state.lock().region = Some(tx.into_region());
                }
                match value {
                    Some(value) => {
                        trace!(observation = self.id, version, "value computed");
                        self.deliver(Event::Value(value));
                    }
                    None => trace!(observation = self.id, version, "duplicate value skipped"),
                }
                self.settle();
            }
            Err(err) => {
                warn!(
                    observation = self.id,
                    store = %self.store,
                    version,
                    error = %err,
                    "recompute failed"
                );
                self.terminate(Event::Failed(err));
            }
        }
    }

    /// Decides what follows a finished evaluation.
    fn settle(&self) {
        let next = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if state.done {
                return;
            }
            let pending = state.pending.take();
            match pending {
                Some(pending)
                    if state
                        .region
                        .as_ref()
                        .map_or(true, |region| region.intersects(&pending.changes)) =>
                {
                    Next::CatchUp(pending.snapshot)
                }
                _ if state.closed => Next::Finish,
                _ => {
                    state.running = false;
                    Next::Idle
                }
            }
        };

        match next {
            Next::CatchUp(snapshot) => {
                trace!(observation = self.id, version = snapshot.version(), "catching up");
                self.schedule(snapshot);
            }
            Next::Finish => self.terminate(Event::Finished),
            Next::Idle => {}
        }
    }

    fn deliver(&self, event: Event<T>) {
        let _gate = self.gate.lock();
        if self.cancelled.load(Ordering::Acquire) {
            return;
        }
        let mut sink = self.sink.lock();
        (*sink)(event);
    }

    fn terminate(&self, event: Event<T>) {
        {
            let mut state = self.state.lock();
            if state.done {
                return;
            }
            state.done = true;
            state.running = false;
            state.pending = None;
        }
        if matches!(event, Event::Finished) {
            debug!(observation = self.id, store = %self.store, "observation finished");
        }
        self.deliver(event);
        self.unregister();
    }

    fn unregister(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }
}

impl<T: Send + 'static> CommitObserver for Shared<T> {
    fn on_commit(&self, commit: &Arc<Commit>) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.done {
            return;
        }

        if state.running {
            match state.pending.as_mut() {
                Some(pending) => {
                    pending.changes.merge(commit.changes());
                    pending.snapshot = commit.snapshot().clone();
                }
                None => {
                    state.pending = Some(Pending {
                        snapshot: commit.snapshot().clone(),
                        changes: commit.changes().clone(),
                    });
                }
            }
            trace!(observation = self.id, version = commit.version(), "commit deferred");
            return;
        }

        let touched = state
            .region
            .as_ref()
            .map_or(true, |region| region.intersects(commit.changes()));
        if !touched {
            trace!(observation = self.id, version = commit.version(), "commit skipped");
            return;
        }
        state.running = true;
        drop(guard);

        self.schedule(commit.snapshot().clone());
    }

    fn on_close(&self) {
        let finish_now = {
            let mut state = self.state.lock();
            if state.done {
                return;
            }
            state.closed = true;
            if state.running {
                false
            } else {
                state.running = true;
                true
            }
        };
        if finish_now {
            self.spawn(|shared| shared.terminate(Event::Finished));
        }
    }
}

impl<T: Send + 'static> ObservationControl for Shared<T> {
    fn id(&self) -> ObservationId {
        self.id
    }

    fn cancel(&self) {
        let first = !self.cancelled.swap(true, Ordering::AcqRel);
        // Wait out a delivery in progress on another thread
        drop(self.gate.lock());
        if !first {
            return;
        }
        {
            let mut state = self.state.lock();
            state.done = true;
            state.pending = None;
        }
        self.unregister();
        debug!(observation = self.id, store = %self.store, "observation cancelled");
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn is_active(&self) -> bool {
        !self.state.lock().done
    }
}
