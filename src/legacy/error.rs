//! Error records and the shared error queue
//!
//! Two kinds of error data flow through the legacy layer:
//!
//! - `ErrorRecord` is the structured cause recorded at the failure site by the
//!   engine or handshake driver. It is consumed once, when surfaced.
//! - `ReportedError` is what the legacy caller sees on the `ErrorQueue`,
//!   carrying a legacy `Reason` and the source location that produced it.

use super::engine::AlertDescription;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::panic::Location;

/// Structured cause of a fatal engine condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCause {
    /// Peer certificate (or certificate verify) failed validation
    VerifyFailed,
    /// Handshake retry (hello retry request) could not be satisfied
    HandshakeRetryFailed,
    /// A handshake message carried trailing bytes
    TrailingData,
    /// No cipher suite in common with the peer
    NoSharedCipher,
    /// Anything else
    Unknown,
}

/// Cause plus the source location where it was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorRecord {
    pub cause: ErrorCause,
    pub file: &'static str,
    pub line: u32,
}

impl ErrorRecord {
    /// Record `cause` at the caller's location
    #[track_caller]
    pub fn new(cause: ErrorCause) -> Self {
        let location = Location::caller();
        ErrorRecord {
            cause,
            file: location.file(),
            line: location.line(),
        }
    }
}

/// Legacy reason codes reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    CertificateVerifyFailed,
    NoCiphersAvailable,
    ExtraDataInMessage,
    NoSharedCipher,
    Unknown,
    InternalError,
    ShouldNotHaveBeenCalled,
    BadLength,
    TransportNotSet,
    Uninitialized,
    /// A fatal alert was sent or received
    Alert(AlertDescription),
}

impl Reason {
    /// Get reason name
    pub fn name(&self) -> &'static str {
        match self {
            Reason::CertificateVerifyFailed => "certificate verify failed",
            Reason::NoCiphersAvailable => "no ciphers available",
            Reason::ExtraDataInMessage => "extra data in message",
            Reason::NoSharedCipher => "no shared cipher",
            Reason::Unknown => "unknown",
            Reason::InternalError => "internal error",
            Reason::ShouldNotHaveBeenCalled => "should not have been called",
            Reason::BadLength => "bad length",
            Reason::TransportNotSet => "transport not set",
            Reason::Uninitialized => "uninitialized",
            Reason::Alert(_) => "alert",
        }
    }
}

impl From<ErrorCause> for Reason {
    fn from(cause: ErrorCause) -> Self {
        match cause {
            ErrorCause::VerifyFailed => Reason::CertificateVerifyFailed,
            ErrorCause::HandshakeRetryFailed => Reason::NoCiphersAvailable,
            ErrorCause::TrailingData => Reason::ExtraDataInMessage,
            ErrorCause::NoSharedCipher => Reason::NoSharedCipher,
            ErrorCause::Unknown => Reason::Unknown,
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Alert(alert) => write!(f, "alert {}", alert),
            other => f.write_str(other.name()),
        }
    }
}

/// An entry on the error queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{reason} ({file}:{line})")]
pub struct ReportedError {
    pub reason: Reason,
    pub file: &'static str,
    pub line: u32,
}

impl ReportedError {
    /// Report `reason` at the caller's location
    #[track_caller]
    pub fn new(reason: Reason) -> Self {
        let location = Location::caller();
        ReportedError {
            reason,
            file: location.file(),
            line: location.line(),
        }
    }

    /// Report the reason mapped from a recorded cause, keeping its location
    pub fn from_record(record: ErrorRecord) -> Self {
        ReportedError {
            reason: record.cause.into(),
            file: record.file,
            line: record.line,
        }
    }
}

/// Entries kept on an `ErrorQueue` before the oldest is overwritten
pub const ERROR_QUEUE_DEPTH: usize = 16;

/// Shared error-reporting queue, oldest entry first
///
/// Bounded like a ring: a caller that never drains it only loses the oldest
/// reports.
#[derive(Debug, Default)]
pub struct ErrorQueue {
    entries: RefCell<VecDeque<ReportedError>>,
}

impl ErrorQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an entry, dropping the oldest one when the queue is full
    pub fn push(&self, error: ReportedError) {
        let mut entries = self.entries.borrow_mut();
        if entries.len() == ERROR_QUEUE_DEPTH {
            entries.pop_front();
        }
        entries.push_back(error);
    }

    /// Remove and return the oldest entry
    pub fn pop(&self) -> Option<ReportedError> {
        self.entries.borrow_mut().pop_front()
    }

    /// Oldest entry without removing it
    pub fn peek(&self) -> Option<ReportedError> {
        self.entries.borrow().front().copied()
    }

    /// Most recent entry without removing it
    pub fn peek_last(&self) -> Option<ReportedError> {
        self.entries.borrow().back().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Remove and return all entries
    pub fn drain(&self) -> Vec<ReportedError> {
        self.entries.borrow_mut().drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_to_reason() {
        assert_eq!(Reason::from(ErrorCause::VerifyFailed), Reason::CertificateVerifyFailed);
        assert_eq!(Reason::from(ErrorCause::HandshakeRetryFailed), Reason::NoCiphersAvailable);
        assert_eq!(Reason::from(ErrorCause::TrailingData), Reason::ExtraDataInMessage);
        assert_eq!(Reason::from(ErrorCause::NoSharedCipher), Reason::NoSharedCipher);
        assert_eq!(Reason::from(ErrorCause::Unknown), Reason::Unknown);
    }

    #[test]
    fn test_record_captures_location() {
        let record = ErrorRecord::new(ErrorCause::TrailingData);
        assert!(record.file.ends_with("error.rs"));
        assert!(record.line > 0);

        let reported = ReportedError::from_record(record);
        assert_eq!(reported.reason, Reason::ExtraDataInMessage);
        assert_eq!(reported.line, record.line);
    }

    #[test]
    fn test_queue_order() {
        let queue = ErrorQueue::new();
        assert!(queue.is_empty());

        queue.push(ReportedError::new(Reason::BadLength));
        queue.push(ReportedError::new(Reason::InternalError));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek().map(|e| e.reason), Some(Reason::BadLength));
        assert_eq!(queue.peek_last().map(|e| e.reason), Some(Reason::InternalError));

        assert_eq!(queue.pop().map(|e| e.reason), Some(Reason::BadLength));
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_drops_oldest_when_full() {
        let queue = ErrorQueue::new();
        queue.push(ReportedError::new(Reason::BadLength));
        for _ in 0..ERROR_QUEUE_DEPTH {
            queue.push(ReportedError::new(Reason::Unknown));
        }

        assert_eq!(queue.len(), ERROR_QUEUE_DEPTH);
        assert!(queue.drain().iter().all(|e| e.reason == Reason::Unknown));
    }

    #[test]
    fn test_reported_error_display() {
        let err = ReportedError {
            reason: Reason::NoSharedCipher,
            file: "engine.rs",
            line: 12,
        };
        assert_eq!(err.to_string(), "no shared cipher (engine.rs:12)");

        let err = ReportedError {
            reason: Reason::Alert(AlertDescription::HANDSHAKE_FAILURE),
            file: "engine.rs",
            line: 3,
        };
        assert_eq!(err.to_string(), "alert handshake_failure (engine.rs:3)");
    }
}
