//! Legacy session operations
//!
//! `Session` exposes the legacy read/write/shutdown entry points on top of a
//! record-layer engine. Each call either makes progress or returns `-1` with a
//! retry hint; all state needed to resume (handshake flag, write accumulator,
//! close-notify flags) is carried on the session between calls.

use super::config::SessionConfig;
use super::context::Context;
use super::engine::{AlertDescription, HandshakeDriver, RecordLayer};
use super::error::{ErrorQueue, Reason, ReportedError};
use super::outcome::{ContentType, IoOutcome, Retry, ReturnKind, RwState};
use super::translate::return_code;
use super::{Error, Result, DRAIN_BUFFER_SIZE, LEGACY_MAX};
use std::io::{self, Read, Write};
use tracing::{debug, trace, warn};

/// Result of a completed `Session::close`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStatus {
    /// Close-notify sent, peer's close-notify not seen
    Sent,
    /// Close-notify exchanged in both directions
    Complete,
}

/// A legacy-style session over a record-layer engine
///
/// A session is owned by a single caller; it is not `Send`.
pub struct Session<E> {
    engine: Option<E>,
    ctx: Context,
    config: SessionConfig,
    handshake_completed: bool,
    close_notify_sent: bool,
    close_notify_received: bool,
    /// Bytes already accepted for the in-progress no-partial-write call
    pending_write: usize,
}

impl<E: RecordLayer + HandshakeDriver> Session<E> {
    /// Create a session over `engine`
    ///
    /// `ctx` must be the context the engine (and its wire) report into.
    pub fn new(engine: E, ctx: Context, config: SessionConfig) -> Self {
        Session {
            engine: Some(engine),
            ctx,
            config,
            handshake_completed: false,
            close_notify_sent: false,
            close_notify_received: false,
            pending_write: 0,
        }
    }

    /// Create a session with no engine attached
    pub fn detached(config: SessionConfig) -> Self {
        Session {
            engine: None,
            ctx: Context::new(),
            config,
            handshake_completed: false,
            close_notify_sent: false,
            close_notify_received: false,
            pending_write: 0,
        }
    }

    /// Get reference to the engine
    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    /// Get mutable reference to the engine
    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.engine.as_mut()
    }

    /// Connection state shared with the engine
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Allow or forbid partial writes from now on
    pub fn set_partial_write(&mut self, enable: bool) {
        self.config.partial_write = enable;
    }

    pub fn set_quiet_shutdown(&mut self, enable: bool) {
        self.config.quiet_shutdown = enable;
    }

    pub fn is_handshake_complete(&self) -> bool {
        self.handshake_completed
    }

    pub fn close_notify_sent(&self) -> bool {
        self.close_notify_sent
    }

    pub fn close_notify_received(&self) -> bool {
        self.close_notify_received
    }

    /// Bytes accepted so far for an interrupted no-partial-write call
    pub fn pending_write(&self) -> usize {
        self.pending_write
    }

    pub fn rw_state(&self) -> RwState {
        self.ctx.rw_state()
    }

    pub fn retry(&self) -> Option<Retry> {
        self.ctx.retry()
    }

    pub fn errors(&self) -> &ErrorQueue {
        self.ctx.errors()
    }

    /// Drive the handshake
    ///
    /// Positive once complete. Zero or negative results come straight from
    /// the handshake driver.
    pub fn do_handshake(&mut self) -> i32 {
        let Some(engine) = self.engine.as_mut() else {
            return self.reject(Reason::Uninitialized);
        };
        if self.handshake_completed {
            return 1;
        }

        let ret = engine.drive_handshake();
        if ret > 0 {
            debug!("handshake complete");
            self.handshake_completed = true;
        }
        ret
    }

    /// Run the handshake if needed
    ///
    /// Returns `None` once the session is established. A handshake that
    /// finishes during this call still yields `resume` translated, so the
    /// caller retries the original operation.
    fn ensure_handshake(&mut self, resume: IoOutcome) -> Option<i32> {
        if self.handshake_completed {
            return None;
        }
        let ret = self.do_handshake();
        if ret <= 0 {
            return Some(ret);
        }
        Some(return_code(&self.ctx, resume))
    }

    /// Fail the current call without touching the engine
    #[track_caller]
    fn reject(&self, reason: Reason) -> i32 {
        self.ctx.set_retry(None);
        self.ctx.set_rw_state(RwState::Nothing);
        self.ctx.report(reason);
        -1
    }

    /// Validate the caller's record type and length
    fn check_request(&self, content_type: ContentType, len: i32, available: usize) -> Option<usize> {
        if content_type != ContentType::ApplicationData {
            warn!(?content_type, "legacy I/O on non application data");
            self.reject(Reason::ShouldNotHaveBeenCalled);
            return None;
        }
        match usize::try_from(len) {
            Ok(len) if len <= available => Some(len),
            _ => {
                warn!(len, available, "bad legacy length");
                self.reject(Reason::BadLength);
                None
            }
        }
    }

    fn note_end_of_stream(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            if engine.close_notify_received() && !self.close_notify_received {
                debug!("close-notify received");
                self.close_notify_received = true;
            }
        }
    }

    /// Read (or peek) up to `len` bytes of application data into `buf`
    pub fn read_bytes(&mut self, content_type: ContentType, buf: &mut [u8], len: i32, peek: bool) -> i32 {
        if let Some(ret) = self.ensure_handshake(IoOutcome::WantPollIn) {
            return ret;
        }
        let Some(len) = self.check_request(content_type, len, buf.len()) else {
            return -1;
        };

        let outcome = match self.engine.as_mut() {
            Some(engine) if peek => engine.peek_application_data(&mut buf[..len]),
            Some(engine) => engine.read_application_data(&mut buf[..len]),
            None => return self.reject(Reason::Uninitialized),
        };
        trace!(?outcome, len, peek, "read application data");

        if outcome == IoOutcome::EndOfStream {
            self.note_end_of_stream();
        }
        return_code(&self.ctx, outcome)
    }

    /// Write `len` bytes of application data from `buf`
    ///
    /// Without partial-write mode this only returns a positive count once all
    /// `len` bytes are accepted. A would-block keeps the count accepted so far
    /// on the session; the caller must retry with the same buffer.
    pub fn write_bytes(&mut self, content_type: ContentType, buf: &[u8], len: i32) -> i32 {
        if let Some(ret) = self.ensure_handshake(IoOutcome::WantPollOut) {
            return ret;
        }
        let Some(len) = self.check_request(content_type, len, buf.len()) else {
            return -1;
        };
        let buf = &buf[..len];

        let Some(engine) = self.engine.as_mut() else {
            return self.reject(Reason::Uninitialized);
        };

        if self.config.partial_write {
            let outcome = engine.write_application_data(buf);
            trace!(?outcome, len, "partial write");
            return return_code(&self.ctx, outcome);
        }

        let mut sent = self.pending_write;
        if len < sent {
            warn!(len, sent, "write retried with a shorter buffer");
            return self.reject(Reason::BadLength);
        }

        while sent < len {
            let remaining = len - sent;
            match engine.write_application_data(&buf[sent..]) {
                IoOutcome::Success(n) if n > remaining => {
                    self.pending_write = sent;
                    debug!(n, remaining, "engine accepted more than requested");
                    return self.reject(Reason::InternalError);
                }
                IoOutcome::Success(n) if n > 0 => sent += n,
                outcome => {
                    self.pending_write = sent;
                    if outcome.is_would_block() {
                        debug!(sent, remaining, ?outcome, "write interrupted, progress kept");
                    } else if outcome.is_fatal() {
                        debug!(sent, remaining, ?outcome, "write failed");
                    }
                    return return_code(&self.ctx, outcome);
                }
            }
        }

        self.pending_write = 0;
        return_code(&self.ctx, IoOutcome::Success(sent))
    }

    /// Exchange close-notify with the peer
    ///
    /// Call repeatedly until it stops returning `-1`. Returns `1` once
    /// close-notify has been both sent and received, `0` when it was sent but
    /// the stream ended without the peer's close-notify.
    pub fn shutdown(&mut self) -> i32 {
        let engine = match self.engine.as_mut() {
            Some(engine) if !self.config.quiet_shutdown => engine,
            _ => {
                self.close_notify_sent = true;
                self.close_notify_received = true;
                return 1;
            }
        };

        if !self.close_notify_sent {
            // Marked first so a retry flushes instead of resending.
            self.close_notify_sent = true;
            debug!("sending close-notify");
            match engine.send_alert(AlertDescription::CLOSE_NOTIFY) {
                IoOutcome::Success(_) | IoOutcome::EndOfStream => {}
                outcome => return return_code(&self.ctx, outcome),
            }
        }

        match engine.send_pending_output() {
            IoOutcome::Success(_) => {}
            outcome => {
                trace!(?outcome, "close-notify not flushed yet");
                return return_code(&self.ctx, outcome);
            }
        }

        if !self.close_notify_received {
            let mut scratch = [0u8; DRAIN_BUFFER_SIZE];
            let outcome = match engine.read_application_data(&mut scratch) {
                IoOutcome::Success(n) if n > 0 => {
                    warn!(discarded = n, "discarding application data during shutdown");
                    IoOutcome::WantPollIn
                }
                outcome => outcome,
            };
            if outcome != IoOutcome::EndOfStream {
                return return_code(&self.ctx, outcome);
            }
            if engine.close_notify_received() {
                debug!("close-notify received");
                self.close_notify_received = true;
            }
        }

        if self.close_notify_received {
            1
        } else {
            0
        }
    }

    /// Decrypted application data readable without touching the transport
    ///
    /// Negative or oversized engine reports are clamped to zero.
    pub fn pending_bytes(&self) -> i32 {
        let Some(engine) = self.engine.as_ref() else {
            return 0;
        };
        i32::try_from(engine.pending_application_data())
            .ok()
            .filter(|n| *n >= 0)
            .unwrap_or(0)
    }

    /// Classify a legacy result returned by this session
    pub fn return_kind(&self, ret: i32) -> ReturnKind {
        if ret > 0 {
            return ReturnKind::Done;
        }
        if ret == 0 {
            return ReturnKind::ZeroReturn;
        }
        match self.ctx.retry() {
            Some(Retry::Read) => ReturnKind::WantRead,
            Some(Retry::Write) => ReturnKind::WantWrite,
            None => ReturnKind::Fatal,
        }
    }

    fn result_for(&self, ret: i32) -> Result<usize> {
        match self.return_kind(ret) {
            ReturnKind::Done => Ok(ret as usize),
            ReturnKind::ZeroReturn => Ok(0),
            ReturnKind::WantRead => Err(Error::WouldBlock(Retry::Read)),
            ReturnKind::WantWrite => Err(Error::WouldBlock(Retry::Write)),
            ReturnKind::Fatal => Err(Error::Fatal(
                self.ctx
                    .errors()
                    .pop()
                    .unwrap_or_else(|| ReportedError::new(Reason::Unknown)),
            )),
        }
    }

    /// Read application data; `Ok(0)` is end of stream
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let len = legacy_len(buf);
        let ret = self.read_bytes(ContentType::ApplicationData, buf, len, false);
        self.result_for(ret)
    }

    /// Copy application data without consuming it
    pub fn peek(&mut self, buf: &mut [u8]) -> Result<usize> {
        let len = legacy_len(buf);
        let ret = self.read_bytes(ContentType::ApplicationData, buf, len, true);
        self.result_for(ret)
    }

    /// Write application data
    ///
    /// Bytes the engine accepted before blocking are reported as a short
    /// write instead of being kept for a retry, so an `Err` always means
    /// nothing from `buf` was consumed.
    pub fn send(&mut self, buf: &[u8]) -> Result<usize> {
        let ret = self.write_bytes(ContentType::ApplicationData, buf, legacy_len(buf));
        match self.result_for(ret) {
            Err(Error::WouldBlock(retry)) if self.pending_write > 0 => {
                let accepted = std::mem::take(&mut self.pending_write);
                trace!(accepted, %retry, "short write at would-block");
                Ok(accepted)
            }
            result => result,
        }
    }

    /// Drive `shutdown` once
    pub fn close(&mut self) -> Result<ShutdownStatus> {
        match self.shutdown() {
            1 => Ok(ShutdownStatus::Complete),
            0 => Ok(ShutdownStatus::Sent),
            ret => match self.result_for(ret) {
                Err(e) => Err(e),
                Ok(_) => Err(Error::Closed),
            },
        }
    }
}

/// Request length for `buf`, capped at what the legacy contract can report
fn legacy_len(buf: &[u8]) -> i32 {
    buf.len().min(LEGACY_MAX) as i32
}

impl<E: RecordLayer + HandshakeDriver> Read for Session<E> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv(buf).map_err(io::Error::from)
    }
}

impl<E: RecordLayer + HandshakeDriver> Write for Session<E> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.send(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok(());
        };
        let outcome = engine.send_pending_output();
        let ret = return_code(&self.ctx, outcome);
        if ret < 0 {
            return Err(self.result_for(ret).err().unwrap_or(Error::Closed).into());
        }
        Ok(())
    }
}
