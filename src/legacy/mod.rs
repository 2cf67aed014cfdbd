//! Legacy session adaptation layer
//!
//! This module lets a blocking-style caller (read/write/shutdown returning a
//! single integer plus a retry hint) drive a non-blocking record-layer engine
//! that reports explicit readiness outcomes.
//!
//! # Architecture
//!
//! Three pieces, leaves first:
//!
//! - `Wire` bridges a byte-stream `Transport` to the engine's pull/push
//!   contract, mapping transport conditions to an `IoOutcome`
//! - `translate::return_code` converts every `IoOutcome` into the legacy
//!   integer convention and arms the matching retry hint on the `Context`
//! - `Session` implements read, write and the two-phase close-notify
//!   shutdown on top of the translator
//!
//! All per-connection state (rw marker, retry hint, error queue, write
//! accumulator, close-notify flags) lives on the `Session` and its `Context`,
//! so independent connections never interfere.
//!
//! # Examples
//!
//! ```no_run
//! use tls_legacy::legacy::{memory_pair, ContentType, SessionConfig};
//! use tls_legacy::tls::{self, TlsConfig};
//!
//! let (client_io, _server_io) = memory_pair();
//! let tls_config = TlsConfig::client().unwrap().build().unwrap();
//! let mut session = tls::client_session(&tls_config, SessionConfig::new(), client_io).unwrap();
//!
//! let ret = session.write_bytes(ContentType::ApplicationData, b"ping", 4);
//! if ret < 0 {
//!     // Inspect session.retry() and call again once the transport is ready
//! }
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod memory;
pub mod outcome;
pub mod session;
pub mod translate;
pub mod wire;

pub use config::SessionConfig;
pub use context::Context;
pub use engine::{AlertDescription, HandshakeDriver, RecordLayer};
pub use error::{ErrorCause, ErrorQueue, ErrorRecord, Reason, ReportedError, ERROR_QUEUE_DEPTH};
pub use memory::{memory_pair, memory_pair_with_capacity, MemoryTransport};
pub use outcome::{ContentType, IoOutcome, Retry, ReturnKind, RwState};
pub use session::{Session, ShutdownStatus};
pub use translate::return_code;
pub use wire::{wait_ready, StreamTransport, Transport, TransportError, Wire};

/// Result type for the Rust-native session boundary
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the Rust-native session boundary
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation would block, retry on {0}")]
    WouldBlock(Retry),

    #[error("Fatal error: {0}")]
    Fatal(#[from] ReportedError),

    #[error("Connection closed")]
    Closed,
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::WouldBlock(retry) => {
                std::io::Error::new(std::io::ErrorKind::WouldBlock, Error::WouldBlock(retry))
            }
            Error::Fatal(reported) => std::io::Error::other(reported),
            Error::Closed => std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
        }
    }
}

/// Size of the scratch buffer used to drain application data while waiting
/// for the peer's close-notify
pub const DRAIN_BUFFER_SIZE: usize = 512;

/// Largest count representable in the legacy integer contract
pub const LEGACY_MAX: usize = i32::MAX as usize;
