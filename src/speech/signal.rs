//! One-shot signals between engine callbacks and the pipeline worker
//!
//! The speech engine reports readiness and utterance completion from its own
//! threads. The worker blocks on a `Latch` until the matching `Trigger` fires.
//! Both halves are consumed on use: a trigger fires at most once, a latch is
//! waited on at most once.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Why a wait ended without a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// The trigger was dropped without firing
    Interrupted,
    /// The deadline passed first
    TimedOut,
}

/// Firing half of a one-shot signal
#[derive(Debug)]
pub struct Trigger<T> {
    tx: Sender<T>,
}

/// Waiting half of a one-shot signal
#[derive(Debug)]
pub struct Latch<T> {
    rx: Receiver<T>,
}

/// Create a connected trigger/latch pair
pub fn oneshot<T>() -> (Trigger<T>, Latch<T>) {
    let (tx, rx) = bounded(1);
    (Trigger { tx }, Latch { rx })
}

impl<T> Trigger<T> {
    /// Deliver the value. A latch that was already dropped is not an error.
    pub fn fire(self, value: T) {
        let _ = self.tx.send(value);
    }

    /// Wrap for callbacks that the engine may invoke more than once
    pub fn shared(self) -> SharedTrigger<T> {
        SharedTrigger {
            inner: Arc::new(Mutex::new(Some(self))),
        }
    }
}

impl<T> Latch<T> {
    /// Block until the trigger fires or is dropped
    pub fn wait(self) -> Result<T, WaitError> {
        self.rx.recv().map_err(|_| WaitError::Interrupted)
    }

    /// Like `wait`, but give up after `timeout`
    pub fn wait_timeout(self, timeout: Duration) -> Result<T, WaitError> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => WaitError::TimedOut,
            RecvTimeoutError::Disconnected => WaitError::Interrupted,
        })
    }

    /// `wait` or `wait_timeout` depending on whether a limit is set
    pub fn wait_for(self, timeout: Option<Duration>) -> Result<T, WaitError> {
        match timeout {
            Some(limit) => self.wait_timeout(limit),
            None => self.wait(),
        }
    }
}

/// A trigger that many callback invocations can hold; only the first fires
#[derive(Debug)]
pub struct SharedTrigger<T> {
    inner: Arc<Mutex<Option<Trigger<T>>>>,
}

impl<T> Clone for SharedTrigger<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedTrigger<T> {
    /// Fire if nobody has yet. Returns whether this call fired.
    pub fn fire(&self, value: T) -> bool {
        match self.inner.lock().take() {
            Some(trigger) => {
                trigger.fire(value);
                true
            }
            None => false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.inner.lock().is_none()
    }

    /// Drop the trigger without firing, interrupting the waiter
    pub fn disarm(&self) {
        self.inner.lock().take();
    }
}
