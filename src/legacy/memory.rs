//! In-memory duplex transport
//!
//! `memory_pair` returns two connected non-blocking transports. Each direction
//! is a bounded `BytesMut` pipe: reads from an empty pipe want read readiness,
//! writes to a full pipe want write readiness, and a read after the peer has
//! closed its write side returns end of stream.

use super::wire::{Transport, TransportError};
use bytes::{Buf, BytesMut};
use std::cell::RefCell;
use std::rc::Rc;

/// Default per-direction capacity
pub const DEFAULT_PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Debug)]
struct Pipe {
    buf: BytesMut,
    capacity: usize,
    closed: bool,
}

impl Pipe {
    fn new(capacity: usize) -> Rc<RefCell<Pipe>> {
        Rc::new(RefCell::new(Pipe {
            buf: BytesMut::with_capacity(capacity),
            capacity,
            closed: false,
        }))
    }
}

/// One end of an in-memory connection
#[derive(Debug)]
pub struct MemoryTransport {
    incoming: Rc<RefCell<Pipe>>,
    outgoing: Rc<RefCell<Pipe>>,
}

/// Create a connected pair with the default capacity
pub fn memory_pair() -> (MemoryTransport, MemoryTransport) {
    memory_pair_with_capacity(DEFAULT_PIPE_CAPACITY)
}

/// Create a connected pair whose pipes hold at most `capacity` bytes each
pub fn memory_pair_with_capacity(capacity: usize) -> (MemoryTransport, MemoryTransport) {
    let a_to_b = Pipe::new(capacity);
    let b_to_a = Pipe::new(capacity);

    let a = MemoryTransport {
        incoming: Rc::clone(&b_to_a),
        outgoing: Rc::clone(&a_to_b),
    };
    let b = MemoryTransport {
        incoming: a_to_b,
        outgoing: b_to_a,
    };
    (a, b)
}

impl MemoryTransport {
    /// Close the write side; the peer reads end of stream once drained
    pub fn close_write(&self) {
        self.outgoing.borrow_mut().closed = true;
    }

    /// Bytes waiting to be read on this end
    pub fn readable(&self) -> usize {
        self.incoming.borrow().buf.len()
    }

    /// Bytes written by this end that the peer has not read yet
    pub fn unread(&self) -> usize {
        self.outgoing.borrow().buf.len()
    }

    /// Change the capacity of the outgoing pipe
    pub fn set_write_capacity(&self, capacity: usize) {
        self.outgoing.borrow_mut().capacity = capacity;
    }
}

impl Transport for MemoryTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut pipe = self.incoming.borrow_mut();
        if buf.is_empty() {
            return Ok(0);
        }
        if pipe.buf.is_empty() {
            return if pipe.closed {
                Ok(0)
            } else {
                Err(TransportError::WantRead)
            };
        }

        let n = buf.len().min(pipe.buf.len());
        buf[..n].copy_from_slice(&pipe.buf[..n]);
        pipe.buf.advance(n);
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        let mut pipe = self.outgoing.borrow_mut();
        if pipe.closed {
            return Err(TransportError::Io(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            )));
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let space = pipe.capacity.saturating_sub(pipe.buf.len());
        if space == 0 {
            return Err(TransportError::WantWrite);
        }

        let n = buf.len().min(space);
        pipe.buf.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}
