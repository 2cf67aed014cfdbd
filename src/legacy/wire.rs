//! Wire adapter
//!
//! Bridges a non-blocking byte-stream `Transport` to the engine's pull/push
//! contract. Every non-success transport call maps to exactly one of
//! `WantPollIn`, `WantPollOut`, `EndOfStream` or `Failure`.
//!
//! `Wire` also implements `std::io::Read`/`Write`, so engines built on
//! `Read + Write` streams (such as `openssl::ssl::SslStream`) pull through it.

use super::context::Context;
use super::error::Reason;
use super::outcome::{IoOutcome, Retry, RwState};
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;
use tracing::{debug, trace};

/// Why a transport call made no progress
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport would block until readable")]
    WantRead,

    #[error("transport would block until writable")]
    WantWrite,

    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Non-blocking byte-stream transport
///
/// `read` returning `Ok(0)` for a non-empty buffer means a clean end of
/// stream.
pub trait Transport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError>;

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Adapter from a transport to the engine contract
pub struct Wire<T> {
    transport: Option<T>,
    ctx: Context,
    last_error: Option<io::Error>,
}

impl<T: Transport> Wire<T> {
    /// Create a wire over `transport`, reporting into `ctx`
    pub fn new(transport: T, ctx: Context) -> Self {
        Wire {
            transport: Some(transport),
            ctx,
            last_error: None,
        }
    }

    /// Create a wire with no transport configured yet
    pub fn detached(ctx: Context) -> Self {
        Wire {
            transport: None,
            ctx,
            last_error: None,
        }
    }

    /// Get reference to the transport
    pub fn get_ref(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /// Get mutable reference to the transport
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    /// Connection state this wire reports into
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Pull up to `buf.len()` bytes from the transport
    pub fn read(&mut self, buf: &mut [u8]) -> IoOutcome {
        let Some(transport) = self.transport.as_mut() else {
            self.ctx.report(Reason::TransportNotSet);
            return IoOutcome::Failure;
        };

        self.ctx.set_rw_state(RwState::Reading);

        match transport.read(buf) {
            Ok(n) if n == buf.len() => {
                self.ctx.set_rw_state(RwState::Nothing);
                IoOutcome::Success(n)
            }
            Ok(0) => IoOutcome::EndOfStream,
            Ok(n) => IoOutcome::Success(n),
            Err(TransportError::WantRead) => IoOutcome::WantPollIn,
            Err(TransportError::WantWrite) => IoOutcome::WantPollOut,
            Err(TransportError::Io(e)) => {
                debug!(error = %e, "transport read failed");
                self.last_error = Some(e);
                IoOutcome::Failure
            }
        }
    }

    /// Push up to `buf.len()` bytes to the transport
    pub fn write(&mut self, buf: &[u8]) -> IoOutcome {
        let Some(transport) = self.transport.as_mut() else {
            self.ctx.report(Reason::TransportNotSet);
            return IoOutcome::Failure;
        };

        self.ctx.set_rw_state(RwState::Writing);

        match transport.write(buf) {
            Ok(n) if n == buf.len() => {
                self.ctx.set_rw_state(RwState::Nothing);
                IoOutcome::Success(n)
            }
            Ok(0) => {
                debug!("transport accepted no bytes");
                IoOutcome::Failure
            }
            Ok(n) => IoOutcome::Success(n),
            Err(TransportError::WantRead) => IoOutcome::WantPollIn,
            Err(TransportError::WantWrite) => IoOutcome::WantPollOut,
            Err(TransportError::Io(e)) => {
                debug!(error = %e, "transport write failed");
                self.last_error = Some(e);
                IoOutcome::Failure
            }
        }
    }

    fn into_io_result(&mut self, outcome: IoOutcome) -> io::Result<usize> {
        trace!(?outcome, "wire callback");
        match outcome {
            IoOutcome::Success(n) => Ok(n),
            IoOutcome::EndOfStream => Ok(0),
            IoOutcome::WantPollIn | IoOutcome::WantPollOut => {
                Err(io::Error::from(io::ErrorKind::WouldBlock))
            }
            _ => Err(self
                .last_error
                .take()
                .unwrap_or_else(|| io::Error::other("transport failure"))),
        }
    }
}

impl<T: Transport> Read for Wire<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let outcome = Wire::read(self, buf);
        self.into_io_result(outcome)
    }
}

impl<T: Transport> Write for Wire<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let outcome = Wire::write(self, buf);
        self.into_io_result(outcome)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.transport.as_mut() {
            Some(transport) => match transport.flush() {
                Ok(()) => Ok(()),
                Err(TransportError::WantRead) | Err(TransportError::WantWrite) => {
                    Err(io::Error::from(io::ErrorKind::WouldBlock))
                }
                Err(TransportError::Io(e)) => Err(e),
            },
            None => Ok(()),
        }
    }
}

/// Transport over any non-blocking `Read + Write` stream
///
/// `WouldBlock` on read means wait for readability, on write wait for
/// writability. `Interrupted` is reported the same way so the caller simply
/// retries.
pub struct StreamTransport<S> {
    stream: S,
}

impl<S: Read + Write> StreamTransport<S> {
    /// Wrap a stream (which should already be in non-blocking mode)
    pub fn new(stream: S) -> Self {
        StreamTransport { stream }
    }

    /// Get reference to the underlying stream
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Get mutable reference to the underlying stream
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.stream.read(buf) {
            Ok(n) => Ok(n),
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::Interrupted =>
            {
                Err(TransportError::WantRead)
            }
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        match self.stream.write(buf) {
            Ok(n) => Ok(n),
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::Interrupted =>
            {
                Err(TransportError::WantWrite)
            }
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        match self.stream.flush() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(TransportError::WantWrite),
            Err(e) => Err(TransportError::Io(e)),
        }
    }
}

impl<S: AsRawFd> AsRawFd for StreamTransport<S> {
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

/// Wait until `fd` satisfies the readiness a session asked for
///
/// Returns `false` on timeout. `None` waits forever.
pub fn wait_ready<F: AsRawFd>(fd: &F, retry: Retry, timeout: Option<Duration>) -> io::Result<bool> {
    use libc::{poll, pollfd, POLLIN, POLLOUT};

    let mut pfd = pollfd {
        fd: fd.as_raw_fd(),
        events: match retry {
            Retry::Read => POLLIN,
            Retry::Write => POLLOUT,
        },
        revents: 0,
    };

    let timeout_ms = timeout
        .map(|d| d.as_millis().min(i32::MAX as u128) as i32)
        .unwrap_or(-1);

    let result = unsafe { poll(&mut pfd as *mut pollfd, 1, timeout_ms) };

    if result < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(result > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::net::{TcpListener, TcpStream};

    /// Transport that replays scripted results
    struct Scripted {
        reads: VecDeque<Result<usize, TransportError>>,
        writes: VecDeque<Result<usize, TransportError>>,
    }

    impl Scripted {
        fn reads(results: Vec<Result<usize, TransportError>>) -> Self {
            Scripted { reads: results.into(), writes: VecDeque::new() }
        }

        fn writes(results: Vec<Result<usize, TransportError>>) -> Self {
            Scripted { reads: VecDeque::new(), writes: results.into() }
        }
    }

    impl Transport for Scripted {
        fn read(&mut self, _buf: &mut [u8]) -> Result<usize, TransportError> {
            self.reads.pop_front().unwrap_or(Err(TransportError::WantRead))
        }

        fn write(&mut self, _buf: &[u8]) -> Result<usize, TransportError> {
            self.writes.pop_front().unwrap_or(Err(TransportError::WantWrite))
        }
    }

    #[test]
    fn test_missing_transport_fails() {
        let ctx = Context::new();
        let mut wire: Wire<Scripted> = Wire::detached(ctx.clone());

        let mut buf = [0u8; 4];
        assert_eq!(wire.read(&mut buf), IoOutcome::Failure);
        assert_eq!(wire.write(b"abcd"), IoOutcome::Failure);
        assert_eq!(ctx.errors().len(), 2);
        assert_eq!(ctx.errors().pop().map(|e| e.reason), Some(Reason::TransportNotSet));
        assert_eq!(ctx.rw_state(), RwState::Nothing);
    }

    #[test]
    fn test_full_read_clears_marker() {
        let ctx = Context::new();
        let mut wire = Wire::new(Scripted::reads(vec![Ok(4)]), ctx.clone());

        let mut buf = [0u8; 4];
        assert_eq!(wire.read(&mut buf), IoOutcome::Success(4));
        assert_eq!(ctx.rw_state(), RwState::Nothing);
    }

    #[test]
    fn test_short_read_keeps_marker() {
        let ctx = Context::new();
        let mut wire = Wire::new(Scripted::reads(vec![Ok(2)]), ctx.clone());

        let mut buf = [0u8; 4];
        assert_eq!(wire.read(&mut buf), IoOutcome::Success(2));
        assert_eq!(ctx.rw_state(), RwState::Reading);
    }

    #[test]
    fn test_read_conditions() {
        let ctx = Context::new();
        let mut wire = Wire::new(
            Scripted::reads(vec![
                Err(TransportError::WantRead),
                Err(TransportError::WantWrite),
                Ok(0),
                Err(TransportError::Io(io::Error::from(io::ErrorKind::ConnectionReset))),
            ]),
            ctx.clone(),
        );

        let mut buf = [0u8; 8];
        assert_eq!(wire.read(&mut buf), IoOutcome::WantPollIn);
        assert_eq!(wire.read(&mut buf), IoOutcome::WantPollOut);
        assert_eq!(wire.read(&mut buf), IoOutcome::EndOfStream);
        assert_eq!(wire.read(&mut buf), IoOutcome::Failure);
        assert_eq!(ctx.rw_state(), RwState::Reading);
    }

    #[test]
    fn test_write_conditions() {
        let ctx = Context::new();
        let mut wire = Wire::new(
            Scripted::writes(vec![
                Ok(3),
                Ok(1),
                Err(TransportError::WantWrite),
                Ok(0),
            ]),
            ctx.clone(),
        );

        assert_eq!(wire.write(b"abc"), IoOutcome::Success(3));
        assert_eq!(ctx.rw_state(), RwState::Nothing);
        assert_eq!(wire.write(b"abc"), IoOutcome::Success(1));
        assert_eq!(ctx.rw_state(), RwState::Writing);
        assert_eq!(wire.write(b"abc"), IoOutcome::WantPollOut);
        assert_eq!(wire.write(b"abc"), IoOutcome::Failure);
    }

    #[test]
    fn test_io_read_maps_back() {
        let ctx = Context::new();
        let mut wire = Wire::new(
            Scripted::reads(vec![
                Err(TransportError::WantRead),
                Err(TransportError::Io(io::Error::from(io::ErrorKind::BrokenPipe))),
            ]),
            ctx,
        );

        let mut buf = [0u8; 8];
        let err = Read::read(&mut wire, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);

        let err = Read::read(&mut wire, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_stream_transport_would_block() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let stream = TcpStream::connect(addr).unwrap();
        let (mut peer, _) = listener.accept().unwrap();
        stream.set_nonblocking(true).unwrap();

        let mut transport = StreamTransport::new(stream);
        let mut buf = [0u8; 5];
        assert!(matches!(transport.read(&mut buf), Err(TransportError::WantRead)));

        peer.write_all(b"Hello").unwrap();
        assert!(wait_ready(&transport, Retry::Read, Some(Duration::from_secs(1))).unwrap());

        let n = transport.read(&mut buf).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf, b"Hello");

        drop(peer);
        assert!(wait_ready(&transport, Retry::Read, Some(Duration::from_secs(1))).unwrap());
        assert_eq!(transport.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_wait_ready_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let stream = TcpStream::connect(addr).unwrap();
        let (_peer, _) = listener.accept().unwrap();

        let ready = wait_ready(&stream, Retry::Read, Some(Duration::from_millis(50))).unwrap();
        assert!(!ready);
        assert!(wait_ready(&stream, Retry::Write, Some(Duration::from_millis(50))).unwrap());
    }
}
