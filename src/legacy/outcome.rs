//! I/O outcomes and legacy result vocabulary
//!
//! `IoOutcome` is what the engine and the wire adapter produce; the rest of
//! this module describes what the legacy caller sees.

use std::fmt;

/// Outcome of a single non-blocking engine or transport call
///
/// Exactly one variant is active. `Success` always carries a count no larger
/// than the length that was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOutcome {
    /// Bytes transferred (or operation completed for non-data calls)
    Success(usize),
    /// Clean end of stream
    EndOfStream,
    /// Retry once the transport is readable
    WantPollIn,
    /// Retry once the transport is writable
    WantPollOut,
    /// Engine-internal retry that must never escape the engine
    WantRetry,
    /// A fatal alert was sent or received
    Alert,
    /// Any other failure
    Failure,
}

impl IoOutcome {
    /// Raw sentinel for a completed non-data operation
    pub const RAW_SUCCESS: isize = 1;
    pub const RAW_EOF: isize = 0;
    pub const RAW_FAILURE: isize = -1;
    pub const RAW_ALERT: isize = -2;
    pub const RAW_WANT_POLLIN: isize = -3;
    pub const RAW_WANT_POLLOUT: isize = -4;
    pub const RAW_WANT_RETRY: isize = -5;

    /// Decode the signed sentinel convention used by record-layer engines
    ///
    /// Unknown negative values decode as `WantRetry`, which the translator
    /// treats as an internal error.
    pub fn from_raw(raw: isize) -> Self {
        match raw {
            n if n > 0 => IoOutcome::Success(n as usize),
            Self::RAW_EOF => IoOutcome::EndOfStream,
            Self::RAW_FAILURE => IoOutcome::Failure,
            Self::RAW_ALERT => IoOutcome::Alert,
            Self::RAW_WANT_POLLIN => IoOutcome::WantPollIn,
            Self::RAW_WANT_POLLOUT => IoOutcome::WantPollOut,
            _ => IoOutcome::WantRetry,
        }
    }

    /// Encode into the signed sentinel convention
    ///
    /// Counts above `isize::MAX` saturate. `Success(0)` has no raw form and
    /// encodes as `RAW_EOF`.
    pub fn to_raw(self) -> isize {
        match self {
            IoOutcome::Success(n) => isize::try_from(n).unwrap_or(isize::MAX),
            IoOutcome::EndOfStream => Self::RAW_EOF,
            IoOutcome::Failure => Self::RAW_FAILURE,
            IoOutcome::Alert => Self::RAW_ALERT,
            IoOutcome::WantPollIn => Self::RAW_WANT_POLLIN,
            IoOutcome::WantPollOut => Self::RAW_WANT_POLLOUT,
            IoOutcome::WantRetry => Self::RAW_WANT_RETRY,
        }
    }

    /// True for outcomes that ask the caller to wait on readiness
    pub fn is_would_block(&self) -> bool {
        matches!(self, IoOutcome::WantPollIn | IoOutcome::WantPollOut)
    }

    /// True for outcomes that end the connection
    pub fn is_fatal(&self) -> bool {
        matches!(self, IoOutcome::Failure | IoOutcome::Alert | IoOutcome::WantRetry)
    }
}

/// Record content type, as passed by legacy callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContentType {
    ChangeCipherSpec = 20,
    Alert = 21,
    Handshake = 22,
    ApplicationData = 23,
}

impl ContentType {
    /// Create content type from its wire value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            20 => Some(ContentType::ChangeCipherSpec),
            21 => Some(ContentType::Alert),
            22 => Some(ContentType::Handshake),
            23 => Some(ContentType::ApplicationData),
            _ => None,
        }
    }

    /// Wire value
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Readiness condition the caller must wait for before retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retry {
    Read,
    Write,
}

impl fmt::Display for Retry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Retry::Read => f.write_str("read readiness"),
            Retry::Write => f.write_str("write readiness"),
        }
    }
}

/// What the connection is currently blocked on, if anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RwState {
    #[default]
    Nothing,
    Reading,
    Writing,
}

/// Classification of a legacy integer result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    /// Positive progress
    Done,
    /// Clean end of stream
    ZeroReturn,
    /// Retry after the transport becomes readable
    WantRead,
    /// Retry after the transport becomes writable
    WantWrite,
    /// Fatal, consult the error queue
    Fatal,
}
