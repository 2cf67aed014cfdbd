//! OpenSSL record-layer engine
//!
//! `TlsRecordLayer` drives an OpenSSL `SslStream` whose underlying stream is
//! a `Wire`, so every byte OpenSSL pulls or pushes goes through the wire
//! adapter and updates the connection's `Context`.

use super::config::TlsConfig;
use super::TlsError;
use crate::legacy::context::Context;
use crate::legacy::engine::{AlertDescription, HandshakeDriver, RecordLayer};
use crate::legacy::error::{ErrorCause, ErrorRecord};
use crate::legacy::outcome::IoOutcome;
use crate::legacy::translate::return_code;
use crate::legacy::wire::{Transport, Wire};
use openssl::ssl::{self, ErrorCode, ShutdownState, Ssl, SslRef, SslStream};
use std::io::{self, Write};
use tracing::{debug, trace};

/// Record layer backed by OpenSSL
pub struct TlsRecordLayer<T: Transport> {
    stream: SslStream<Wire<T>>,
    ctx: Context,
    /// close-notify queued but not fully written
    shutdown_pending: bool,
}

impl<T: Transport> TlsRecordLayer<T> {
    /// Create an engine for `config` pulling through `wire`
    pub fn new(config: &TlsConfig, wire: Wire<T>) -> Result<Self, TlsError> {
        let ctx = wire.context().clone();
        let mut ssl = Ssl::new(&config.ctx)?;

        if config.is_server {
            ssl.set_accept_state();
        } else {
            // Set SNI servername if configured
            if let Some(ref servername) = config.servername {
                ssl.set_hostname(servername)?;
            }
            ssl.set_connect_state();
        }

        let stream = SslStream::new(ssl, wire)?;

        Ok(TlsRecordLayer {
            stream,
            ctx,
            shutdown_pending: false,
        })
    }

    /// Connection state this engine reports into
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Get reference to the OpenSSL session
    pub fn ssl(&self) -> &SslRef {
        self.stream.ssl()
    }

    /// Negotiated protocol version (e.g. "TLSv1.3")
    pub fn version(&self) -> &'static str {
        self.stream.ssl().version_str()
    }

    /// Negotiated cipher suite
    pub fn cipher(&self) -> Option<&'static str> {
        self.stream.ssl().current_cipher().map(|c| c.name())
    }

    /// Get reference to the wire
    pub fn wire(&self) -> &Wire<T> {
        self.stream.get_ref()
    }

    /// Get mutable reference to the wire
    pub fn wire_mut(&mut self) -> &mut Wire<T> {
        self.stream.get_mut()
    }

    /// Map an OpenSSL error to an outcome, recording fatal causes
    fn outcome(&self, err: ssl::Error) -> IoOutcome {
        match err.code() {
            ErrorCode::WANT_READ => IoOutcome::WantPollIn,
            ErrorCode::WANT_WRITE => IoOutcome::WantPollOut,
            ErrorCode::ZERO_RETURN => IoOutcome::EndOfStream,
            // Transport EOF without close-notify (OpenSSL 1.1 reports it this way)
            ErrorCode::SYSCALL if err.io_error().is_none() && err.ssl_error().is_none() => {
                IoOutcome::EndOfStream
            }
            _ => {
                debug!(error = %err, "OpenSSL failure");
                if self.classify(&err) {
                    IoOutcome::Alert
                } else {
                    IoOutcome::Failure
                }
            }
        }
    }

    /// Record the cause of `err` on the context; true if it was an alert
    fn classify(&self, err: &ssl::Error) -> bool {
        let Some(stack) = err.ssl_error() else {
            return false;
        };

        let mut alert = false;
        for entry in stack.errors() {
            let Some(reason) = entry.reason() else {
                continue;
            };
            let reason = reason.to_ascii_lowercase();

            if let Some(description) = alert_from_reason(&reason) {
                self.ctx.record_fatal_alert(description);
                alert = true;
                continue;
            }

            let cause = match reason.as_str() {
                "certificate verify failed" => ErrorCause::VerifyFailed,
                "no shared cipher" => ErrorCause::NoSharedCipher,
                "extra data in message" => ErrorCause::TrailingData,
                "no ciphers available" | "no suitable key share" => ErrorCause::HandshakeRetryFailed,
                _ => continue,
            };
            self.ctx.record_error(ErrorRecord::new(cause));
        }
        alert
    }
}

/// Parse the alert out of reasons such as "tlsv1 alert unknown ca"
fn alert_from_reason(reason: &str) -> Option<AlertDescription> {
    let (prefix, name) = reason.split_once(" alert ")?;
    if !prefix.starts_with("ssl") && !prefix.starts_with("tls") {
        return None;
    }
    AlertDescription::from_name(name)
}

impl<T: Transport> RecordLayer for TlsRecordLayer<T> {
    fn read_application_data(&mut self, buf: &mut [u8]) -> IoOutcome {
        if buf.is_empty() {
            return IoOutcome::Success(0);
        }
        match self.stream.ssl_read(buf) {
            Ok(n) => IoOutcome::Success(n),
            Err(e) => self.outcome(e),
        }
    }

    fn peek_application_data(&mut self, buf: &mut [u8]) -> IoOutcome {
        if buf.is_empty() {
            return IoOutcome::Success(0);
        }
        match self.stream.ssl_peek(buf) {
            Ok(n) => IoOutcome::Success(n),
            Err(e) => self.outcome(e),
        }
    }

    fn write_application_data(&mut self, buf: &[u8]) -> IoOutcome {
        if buf.is_empty() {
            return IoOutcome::Success(0);
        }
        match self.stream.ssl_write(buf) {
            Ok(n) => IoOutcome::Success(n),
            Err(e) => self.outcome(e),
        }
    }

    fn send_pending_output(&mut self) -> IoOutcome {
        if self.shutdown_pending {
            return match self.stream.shutdown() {
                Ok(_) => {
                    self.shutdown_pending = false;
                    IoOutcome::Success(0)
                }
                Err(e) => self.outcome(e),
            };
        }

        match self.stream.get_mut().flush() {
            Ok(()) => IoOutcome::Success(0),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => IoOutcome::WantPollOut,
            Err(e) => {
                debug!(error = %e, "flush failed");
                IoOutcome::Failure
            }
        }
    }

    fn send_alert(&mut self, alert: AlertDescription) -> IoOutcome {
        if alert != AlertDescription::CLOSE_NOTIFY {
            // OpenSSL only lets us originate close-notify.
            debug!(%alert, "unsupported alert");
            self.ctx.record_error(ErrorRecord::new(ErrorCause::Unknown));
            return IoOutcome::Failure;
        }

        match self.stream.shutdown() {
            Ok(result) => {
                trace!(?result, "close-notify written");
                IoOutcome::Success(0)
            }
            Err(e) => {
                let outcome = self.outcome(e);
                if outcome == IoOutcome::WantPollOut {
                    self.shutdown_pending = true;
                }
                outcome
            }
        }
    }

    fn pending_application_data(&self) -> isize {
        isize::try_from(self.stream.ssl().pending()).unwrap_or(isize::MAX)
    }

    fn close_notify_received(&mut self) -> bool {
        self.stream.get_shutdown().contains(ShutdownState::RECEIVED)
    }
}

impl<T: Transport> HandshakeDriver for TlsRecordLayer<T> {
    fn drive_handshake(&mut self) -> i32 {
        match self.stream.do_handshake() {
            Ok(()) => {
                debug!(version = self.version(), cipher = ?self.cipher(), "TLS handshake complete");
                1
            }
            Err(e) => {
                let outcome = self.outcome(e);
                return_code(&self.ctx, outcome)
            }
        }
    }
}
