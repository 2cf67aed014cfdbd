//! Per-connection shared state
//!
//! The session, its wire adapter and its engine all need to update the same
//! connection markers: the wire marks the connection as reading or writing,
//! the translator arms retry hints, the engine records error causes. `Context`
//! is a cheap handle to that state, cloned into each of them.
//!
//! A `Context` belongs to exactly one connection and is not thread-safe.

use super::engine::AlertDescription;
use super::error::{ErrorQueue, ErrorRecord, Reason, ReportedError};
use super::outcome::{Retry, RwState};
use std::cell::Cell;
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Default)]
struct Inner {
    rw_state: Cell<RwState>,
    retry: Cell<Option<Retry>>,
    fatal_alert: Cell<Option<AlertDescription>>,
    error: Cell<Option<ErrorRecord>>,
    errors: ErrorQueue,
}

/// Handle to one connection's shared markers and error state
#[derive(Debug, Clone, Default)]
pub struct Context {
    inner: Rc<Inner>,
}

impl Context {
    /// Create fresh connection state
    pub fn new() -> Self {
        Self::default()
    }

    /// What the connection is currently blocked on
    pub fn rw_state(&self) -> RwState {
        self.inner.rw_state.get()
    }

    pub fn set_rw_state(&self, state: RwState) {
        self.inner.rw_state.set(state);
    }

    /// Readiness condition to wait for before retrying, if any
    pub fn retry(&self) -> Option<Retry> {
        self.inner.retry.get()
    }

    pub fn set_retry(&self, retry: Option<Retry>) {
        self.inner.retry.set(retry);
    }

    /// Fatal alert sent or received on this connection, if any
    pub fn fatal_alert(&self) -> Option<AlertDescription> {
        self.inner.fatal_alert.get()
    }

    /// Record a fatal alert and report it on the error queue
    ///
    /// Only the first fatal alert is kept.
    #[track_caller]
    pub fn record_fatal_alert(&self, alert: AlertDescription) {
        if self.inner.fatal_alert.get().is_some() {
            return;
        }
        debug!(%alert, "fatal alert recorded");
        self.inner.fatal_alert.set(Some(alert));
        self.inner.errors.push(ReportedError::new(Reason::Alert(alert)));
    }

    /// Record the structured cause of a fatal condition
    ///
    /// An already recorded cause is kept; the first failure site is the most
    /// specific one.
    pub fn record_error(&self, record: ErrorRecord) {
        if self.inner.error.get().is_none() {
            self.inner.error.set(Some(record));
        }
    }

    /// Consume the recorded cause
    pub fn take_error(&self) -> Option<ErrorRecord> {
        self.inner.error.take()
    }

    /// Push `reason` on the error queue at the caller's location
    #[track_caller]
    pub fn report(&self, reason: Reason) {
        self.inner.errors.push(ReportedError::new(reason));
    }

    /// The shared error queue
    pub fn errors(&self) -> &ErrorQueue {
        &self.inner.errors
    }
}
