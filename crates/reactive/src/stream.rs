//! Pull-based access to an observation's values.

use crate::observation::Event;
use crate::subscription::Observer;
use lookout_core::Result;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// A blocking iterator over the values of an observation.
///
/// Yields `Ok(value)` for each delivered value and one `Err` if the
/// computation fails, then ends. It also ends when the store goes away.
/// Dropping the stream cancels the observation.
pub struct ValueStream<T> {
    receiver: Receiver<Event<T>>,
    observer: Observer,
    finished: bool,
}

impl<T> ValueStream<T> {
    pub(crate) fn new(receiver: Receiver<Event<T>>, observer: Observer) -> Self {
        Self {
            receiver,
            observer,
            finished: false,
        }
    }

    /// Waits up to `timeout` for the next item.
    ///
    /// Returns `None` on timeout or once the stream has ended; use
    /// `is_finished` to tell the two apart.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<Result<T>> {
        if self.finished {
            return None;
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => self.accept(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.finished = true;
                None
            }
        }
    }

    /// Returns the next item if one is ready.
    pub fn try_next(&mut self) -> Option<Result<T>> {
        if self.finished {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(event) => self.accept(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finished = true;
                None
            }
        }
    }

    /// Returns true once the stream has ended.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The underlying observer.
    #[inline]
    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    /// Cancels the observation. Values already queued are still returned.
    pub fn cancel(&self) {
        self.observer.cancel();
    }

    fn accept(&mut self, event: Event<T>) -> Option<Result<T>> {
        match event {
            Event::Value(value) => Some(Ok(value)),
            Event::Failed(err) => {
                self.finished = true;
                Some(Err(err))
            }
            Event::Finished => {
                self.finished = true;
                None
            }
        }
    }
}

impl<T> Iterator for ValueStream<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        if self.finished {
            return None;
        }
        match self.receiver.recv() {
            Ok(event) => self.accept(event),
            Err(_) => {
                self.finished = true;
                None
            }
        }
    }
}
