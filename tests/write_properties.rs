//! Property tests for the no-partial-write accumulator
//!
//! The engine here accepts writes in scripted chunk sizes and blocks at
//! scripted points, so the session has to stitch one legacy write together
//! from many engine writes.

use proptest::collection::vec;
use proptest::option;
use proptest::prelude::*;
use std::collections::VecDeque;
use tls_legacy::legacy::{
    AlertDescription, ContentType, Context, HandshakeDriver, IoOutcome, Reason, RecordLayer,
    Retry, Session, SessionConfig,
};

/// Engine that takes `Some(n)` bytes per write or blocks on `None`
struct Chunked {
    script: VecDeque<Option<usize>>,
    accepted: Vec<u8>,
}

impl Chunked {
    fn new(script: Vec<Option<usize>>) -> Self {
        Chunked {
            script: script.into(),
            accepted: Vec::new(),
        }
    }
}

impl RecordLayer for Chunked {
    fn read_application_data(&mut self, _buf: &mut [u8]) -> IoOutcome {
        IoOutcome::WantPollIn
    }

    fn peek_application_data(&mut self, _buf: &mut [u8]) -> IoOutcome {
        IoOutcome::WantPollIn
    }

    fn write_application_data(&mut self, buf: &[u8]) -> IoOutcome {
        let n = match self.script.pop_front() {
            Some(None) => return IoOutcome::WantPollOut,
            Some(Some(chunk)) => chunk.min(buf.len()),
            None => buf.len(),
        };
        self.accepted.extend_from_slice(&buf[..n]);
        IoOutcome::Success(n)
    }

    fn send_pending_output(&mut self) -> IoOutcome {
        IoOutcome::Success(0)
    }

    fn send_alert(&mut self, _alert: AlertDescription) -> IoOutcome {
        IoOutcome::Success(0)
    }

    fn pending_application_data(&self) -> isize {
        0
    }

    fn close_notify_received(&mut self) -> bool {
        false
    }
}

impl HandshakeDriver for Chunked {
    fn drive_handshake(&mut self) -> i32 {
        1
    }
}

fn session(script: Vec<Option<usize>>) -> Session<Chunked> {
    let mut session = Session::new(Chunked::new(script), Context::new(), SessionConfig::new());
    assert_eq!(session.do_handshake(), 1);
    session
}

proptest! {
    #[test]
    fn test_retried_write_reports_whole_length(
        data in vec(any::<u8>(), 1..4096),
        script in vec(option::of(1usize..512), 0..64),
    ) {
        let len = data.len() as i32;
        let mut session = session(script.clone());

        let mut result = None;
        for _ in 0..script.len() + 2 {
            let ret = session.write_bytes(ContentType::ApplicationData, &data, len);
            if ret > 0 {
                result = Some(ret);
                break;
            }
            prop_assert_eq!(ret, -1);
            prop_assert_eq!(session.retry(), Some(Retry::Write));
        }

        prop_assert_eq!(result, Some(len));
        prop_assert_eq!(session.pending_write(), 0);
        prop_assert_eq!(&session.engine().unwrap().accepted, &data);
        prop_assert!(session.errors().is_empty());
    }

    #[test]
    fn test_shorter_retry_is_rejected(
        data in vec(any::<u8>(), 2..4096),
        first in 1usize..4096,
        cut in any::<prop::sample::Index>(),
    ) {
        prop_assume!(first < data.len());
        let mut session = session(vec![Some(first), None]);

        let len = data.len() as i32;
        prop_assert_eq!(session.write_bytes(ContentType::ApplicationData, &data, len), -1);
        prop_assert_eq!(session.pending_write(), first);

        let short = cut.index(first);
        prop_assert_eq!(
            session.write_bytes(ContentType::ApplicationData, &data, short as i32),
            -1
        );
        prop_assert_eq!(session.retry(), None);
        prop_assert_eq!(
            session.errors().peek_last().map(|e| e.reason),
            Some(Reason::BadLength)
        );
        prop_assert_eq!(session.engine().unwrap().accepted.len(), first);
    }
}
