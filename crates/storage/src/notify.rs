//! Commit handler registry.
//!
//! The registry keeps the handlers interested in commits. Handlers are
//! snapshotted before dispatch so that one may unregister itself, or register
//! new handlers, while a commit is being delivered.

use crate::store::Commit;
use hashbrown::HashMap;
use std::sync::Arc;

/// Unique identifier for a registered commit handler.
pub type HandlerId = u64;

/// Receives committed changes from a store.
pub trait CommitObserver: Send + Sync {
    /// Called once per commit, in commit order, on the committing thread.
    fn on_commit(&self, commit: &Arc<Commit>);

    /// Called once when the store is closed or dropped.
    fn on_close(&self) {}
}

struct FnObserver<F>(F);

impl<F> CommitObserver for FnObserver<F>
where
    F: Fn(&Arc<Commit>) + Send + Sync,
{
    fn on_commit(&self, commit: &Arc<Commit>) {
        (self.0)(commit)
    }
}

/// Wraps a closure into a commit observer.
pub fn observer_fn<F>(f: F) -> Arc<dyn CommitObserver>
where
    F: Fn(&Arc<Commit>) + Send + Sync + 'static,
{
    Arc::new(FnObserver(f))
}

/// Registered commit handlers.
pub(crate) struct CommitRegistry {
    handlers: HashMap<HandlerId, Arc<dyn CommitObserver>>,
    next_id: HandlerId,
}

impl Default for CommitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommitRegistry {
    pub(crate) fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 1,
        }
    }

    pub(crate) fn register(&mut self, handler: Arc<dyn CommitObserver>) -> HandlerId {
        let id = self.next_id;
        self.next_id += 1;
        self.handlers.insert(id, handler);
        id
    }

    pub(crate) fn unregister(&mut self, id: HandlerId) -> bool {
        self.handlers.remove(&id).is_some()
    }

    /// Returns the handlers to notify for one commit.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn CommitObserver>> {
        self.handlers.values().cloned().collect()
    }

    /// Removes and returns every handler.
    pub(crate) fn drain(&mut self) -> Vec<Arc<dyn CommitObserver>> {
        self.handlers.drain().map(|(_, handler)| handler).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);

    impl CommitObserver for Counting {
        fn on_commit(&self, _commit: &Arc<Commit>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_registry_register() {
        let mut registry = CommitRegistry::new();
        let id1 = registry.register(observer_fn(|_| {}));
        let id2 = registry.register(observer_fn(|_| {}));

        assert_eq!(id1, 1);
        assert_eq!(id2, 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_unregister() {
        let mut registry = CommitRegistry::new();
        let id = registry.register(Arc::new(Counting(AtomicUsize::new(0))));

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id)); // Already removed
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_registry_drain() {
        let mut registry = CommitRegistry::new();
        registry.register(observer_fn(|_| {}));
        registry.register(observer_fn(|_| {}));

        assert_eq!(registry.snapshot().len(), 2);
        assert_eq!(registry.drain().len(), 2);
        assert_eq!(registry.len(), 0);
    }
}
