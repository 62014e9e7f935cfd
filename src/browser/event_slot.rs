//! Single-slot hand-off between a browser event and the call waiting for it.
//!
//! A slot holds at most one pending value. Setting a value while an earlier one
//! is still unconsumed overwrites it (last write wins); a `get` takes the value
//! out, leaving the slot empty. A `get` that times out clears the slot so a later
//! waiter never observes data that arrived for an abandoned wait.
//!
//! Producers may live on any thread (CDP event listeners run on the engine's own
//! threads); waiters are async.

use crate::error::{BrowserError, Result};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug)]
pub struct EventSlot<T> {
    value: Mutex<Option<T>>,
    notify: Notify,
}

impl<T> Default for EventSlot<T> {
    fn default() -> Self {
        Self { value: Mutex::new(None), notify: Notify::new() }
    }
}

impl<T> EventSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any unconsumed one, and wake the waiter
    pub fn set(&self, value: T) {
        if self.value.lock().replace(value).is_some() {
            log::debug!("Event slot overwritten before it was consumed");
        }
        self.notify.notify_one();
    }

    /// Drop any pending value
    pub fn clear(&self) {
        self.value.lock().take();
    }

    pub fn is_set(&self) -> bool {
        self.value.lock().is_some()
    }

    /// Wait up to `timeout` for a value and take it
    pub async fn get(&self, timeout: Duration) -> Result<T> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();

            if let Some(value) = self.value.lock().take() {
                return Ok(value);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                self.clear();
                return Err(BrowserError::Timeout(format!(
                    "No event received within {}ms",
                    timeout.as_millis()
                )));
            }
        }
    }
}
