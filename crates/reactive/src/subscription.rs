//! The cancellation handle of a running observation.

use crate::observation::ObservationId;
use std::fmt;
use std::sync::Arc;

/// Control surface an observation exposes to its handle.
pub(crate) trait ObservationControl: Send + Sync {
    fn id(&self) -> ObservationId;
    fn cancel(&self);
    fn is_cancelled(&self) -> bool;
    fn is_active(&self) -> bool;
}

/// Handle to a running observation. Cancels it when dropped.
#[must_use = "the observation is cancelled when the observer is dropped"]
pub struct Observer {
    control: Arc<dyn ObservationControl>,
}

impl Observer {
    pub(crate) fn new(control: Arc<dyn ObservationControl>) -> Self {
        Self { control }
    }

    /// Returns the observation ID.
    #[inline]
    pub fn id(&self) -> ObservationId {
        self.control.id()
    }

    /// Stops the observation.
    ///
    /// No value is delivered once this returns, even if an evaluation is
    /// still running; its result is dropped. Safe to call more than once,
    /// from any thread, including from inside the subscriber.
    pub fn cancel(&self) {
        self.control.cancel();
    }

    /// Returns true once `cancel` has been called.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }

    /// Returns false once the observation failed, finished, or was
    /// cancelled.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.control.is_active()
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        self.control.cancel();
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.id())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
