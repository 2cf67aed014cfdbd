//! OpenSSL-backed record layer for legacy sessions
//!
//! # Architecture
//!
//! 1. `TlsConfig` defines TLS settings (versions, ciphers, certificates)
//! 2. `TlsRecordLayer` implements `RecordLayer` and `HandshakeDriver` on top
//!    of an OpenSSL stream that pulls and pushes through a `Wire`
//! 3. `client_session`/`server_session` wire the three together around one
//!    shared `Context`
//!
//! # Examples
//!
//! ```no_run
//! use tls_legacy::legacy::{SessionConfig, StreamTransport};
//! use tls_legacy::tls::{self, TlsConfig, TlsVersion};
//! use std::net::TcpStream;
//!
//! let tls_config = TlsConfig::client()
//!     .unwrap()
//!     .version(TlsVersion::Tls13)
//!     .unwrap()
//!     .servername("example.com")
//!     .build()
//!     .unwrap();
//!
//! let stream = TcpStream::connect("example.com:443").unwrap();
//! stream.set_nonblocking(true).unwrap();
//! let mut session =
//!     tls::client_session(&tls_config, SessionConfig::new(), StreamTransport::new(stream)).unwrap();
//! let ret = session.do_handshake();
//! ```

pub mod builtin_cert;
pub mod config;
pub mod engine;

pub use config::{ClientConfigBuilder, ClientVerify, ServerConfigBuilder, TlsConfig, TlsVersion};
pub use engine::TlsRecordLayer;

use crate::legacy::{Context, Session, SessionConfig, Transport, Wire};

/// Result type for TLS setup
pub type Result<T> = std::result::Result<T, TlsError>;

/// TLS-related errors
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TLS version: {0}")]
    InvalidVersion(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Certificate error: {0}")]
    Certificate(String),
}

/// Create a client session over `transport`
pub fn client_session<T: Transport>(
    tls: &TlsConfig,
    config: SessionConfig,
    transport: T,
) -> Result<Session<TlsRecordLayer<T>>> {
    if tls.is_server() {
        return Err(TlsError::InvalidConfig(
            "Cannot use server config for client session".to_string(),
        ));
    }
    session(tls, config, transport)
}

/// Create a server session over `transport`
pub fn server_session<T: Transport>(
    tls: &TlsConfig,
    config: SessionConfig,
    transport: T,
) -> Result<Session<TlsRecordLayer<T>>> {
    if !tls.is_server() {
        return Err(TlsError::InvalidConfig(
            "Cannot use client config for server session".to_string(),
        ));
    }
    session(tls, config, transport)
}

fn session<T: Transport>(
    tls: &TlsConfig,
    config: SessionConfig,
    transport: T,
) -> Result<Session<TlsRecordLayer<T>>> {
    let ctx = Context::new();
    let wire = Wire::new(transport, ctx.clone());
    let engine = tls.engine(wire)?;
    Ok(Session::new(engine, ctx, config))
}
