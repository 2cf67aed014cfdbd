//! Return-code translation
//!
//! Converts engine `IoOutcome`s into the legacy convention: a positive count,
//! `0` for a clean end of stream, or `-1` with the retry hint (or error queue)
//! on the `Context` telling the caller what happened.

use super::context::Context;
use super::error::{Reason, ReportedError};
use super::outcome::{IoOutcome, Retry, RwState};
use tracing::{debug, trace};

/// Translate one outcome into a legacy result
///
/// Checks run in a fixed order: overflow, success, end of stream, fatal,
/// want-read, want-write, want-retry.
#[track_caller]
pub fn return_code(ctx: &Context, outcome: IoOutcome) -> i32 {
    if let IoOutcome::Success(n) = outcome {
        let Ok(count) = i32::try_from(n) else {
            debug!(count = n, "success count overflows legacy result");
            ctx.report(Reason::InternalError);
            return -1;
        };
        ctx.set_retry(None);
        ctx.set_rw_state(RwState::Nothing);
        return count;
    }

    ctx.set_retry(None);
    ctx.set_rw_state(RwState::Nothing);

    trace!(?outcome, "translating non-success outcome");

    match outcome {
        IoOutcome::EndOfStream => 0,
        IoOutcome::Failure | IoOutcome::Alert => {
            surface_error(ctx);
            -1
        }
        IoOutcome::WantPollIn => {
            ctx.set_retry(Some(Retry::Read));
            ctx.set_rw_state(RwState::Reading);
            -1
        }
        IoOutcome::WantPollOut => {
            ctx.set_retry(Some(Retry::Write));
            ctx.set_rw_state(RwState::Writing);
            -1
        }
        IoOutcome::WantRetry | IoOutcome::Success(_) => {
            debug!("engine leaked a retry outcome");
            ctx.report(Reason::InternalError);
            -1
        }
    }
}

/// Push the recorded failure cause onto the error queue
///
/// Does nothing when a fatal alert already put an error on the queue. The
/// generic `Unknown` reason is only pushed when nothing else is queued, since
/// a lower layer may have reported something more specific.
#[track_caller]
pub fn surface_error(ctx: &Context) {
    if ctx.fatal_alert().is_some() {
        return;
    }

    let reported = match ctx.take_error() {
        Some(record) => ReportedError::from_record(record),
        None => ReportedError::new(Reason::Unknown),
    };

    if reported.reason == Reason::Unknown && !ctx.errors().is_empty() {
        return;
    }

    debug!(reason = %reported.reason, "surfacing fatal error");
    ctx.errors().push(reported);
}
