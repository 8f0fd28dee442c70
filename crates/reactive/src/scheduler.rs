//! Execution contexts for observation work.
//!
//! Every evaluation and delivery of an observation runs as a `Job` handed to
//! a `Scheduler`. The observation never submits a second job before the
//! previous one finished, so even a multi-threaded scheduler sees at most one
//! job per observation at a time.

use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, warn};

/// A unit of observation work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs on some execution context.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, job: Job);
}

/// Runs every job immediately on the calling thread.
///
/// Under this scheduler, values triggered by a commit are delivered on the
/// committing thread before the write returns.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn schedule(&self, job: Job) {
        job()
    }
}

struct QueueState {
    jobs: VecDeque<Job>,
    shutdown: bool,
}

struct QueueShared {
    name: String,
    state: Mutex<QueueState>,
    ready: Condvar,
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

impl QueueShared {
    fn run(&self) {
        loop {
            let job = {
                let mut state = self.state.lock();
                loop {
                    if let Some(job) = state.jobs.pop_front() {
                        break Some(job);
                    }
                    if state.shutdown {
                        break None;
                    }
                    self.ready.wait(&mut state);
                }
            };
            match job {
                // A panicking job must not take the worker down with it
                Some(job) => {
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                        warn!(
                            queue = %self.name,
                            panic = %panic_message(payload.as_ref()),
                            "queue job panicked"
                        );
                    }
                }
                None => return,
            }
        }
    }
}

/// A FIFO queue drained by one dedicated worker thread.
///
/// Jobs run strictly in submission order, one at a time. Dropping the queue
/// runs the jobs already submitted, then stops the worker.
pub struct SerialQueue {
    name: String,
    shared: Arc<QueueShared>,
    worker: Option<JoinHandle<()>>,
    worker_id: Option<ThreadId>,
}

static SHARED_QUEUE: Lazy<Arc<SerialQueue>> =
    Lazy::new(|| Arc::new(SerialQueue::with_name("lookout-observation")));

impl SerialQueue {
    /// Creates a queue with an anonymous worker.
    pub fn new() -> Self {
        Self::with_name("lookout-queue")
    }

    /// Creates a queue whose worker thread carries `name`.
    pub fn with_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let shared = Arc::new(QueueShared {
            name: name.clone(),
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                shutdown: false,
            }),
            ready: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = match thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_shared.run())
        {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(queue = %name, error = %err, "failed to spawn queue worker, running jobs inline");
                None
            }
        };
        let worker_id = worker.as_ref().map(|handle| handle.thread().id());
        debug!(queue = %name, "serial queue started");

        Self {
            name,
            shared,
            worker,
            worker_id,
        }
    }

    /// The process-wide default queue, created on first use.
    pub fn shared() -> Arc<SerialQueue> {
        Arc::clone(&SHARED_QUEUE)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true when called from this queue's worker thread.
    pub fn is_current(&self) -> bool {
        self.worker_id == Some(thread::current().id())
    }

    /// Number of jobs waiting to run.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().jobs.len()
    }
}

impl Default for SerialQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for SerialQueue {
    fn schedule(&self, job: Job) {
        if self.worker.is_none() {
            job();
            return;
        }
        self.shared.state.lock().jobs.push_back(job);
        self.shared.ready.notify_one();
    }
}

impl fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialQueue")
            .field("name", &self.name)
            .field("pending", &self.pending())
            .finish()
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.ready.notify_all();
        if let Some(worker) = self.worker.take() {
            // The last handle may be released by one of the queue's own jobs
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                warn!(queue = %self.name, "queue worker panicked");
            }
        }
    }
}

/// Where an observation evaluates and delivers.
#[derive(Clone)]
pub enum Scheduling {
    /// Every evaluation, the first one included, runs on the scheduler.
    Async(Arc<dyn Scheduler>),
    /// The first value is computed and delivered on the subscribing thread
    /// before `start` returns. Later values run on the scheduler.
    Immediate(Arc<dyn Scheduler>),
}

impl Scheduling {
    /// Asynchronous delivery on the given scheduler.
    pub fn on(scheduler: Arc<dyn Scheduler>) -> Self {
        Scheduling::Async(scheduler)
    }

    /// Asynchronous delivery, with the first value delivered synchronously.
    pub fn immediate() -> Self {
        Scheduling::Immediate(SerialQueue::shared())
    }

    /// Everything runs inline: first value on the subscribing thread, later
    /// values on the committing thread.
    pub fn inline() -> Self {
        Scheduling::Immediate(Arc::new(InlineScheduler))
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        match self {
            Scheduling::Async(scheduler) | Scheduling::Immediate(scheduler) => scheduler,
        }
    }

    #[inline]
    pub fn is_immediate(&self) -> bool {
        matches!(self, Scheduling::Immediate(_))
    }
}

impl Default for Scheduling {
    fn default() -> Self {
        Scheduling::Async(SerialQueue::shared())
    }
}

impl fmt::Debug for Scheduling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheduling::Async(_) => f.write_str("Scheduling::Async"),
            Scheduling::Immediate(_) => f.write_str("Scheduling::Immediate"),
        }
    }
}
