//! Destination for errors that nobody is awaiting.
//!
//! Delivery callbacks on scheduled paths run far from whoever subscribed, so
//! a panic there has no caller to return to. Such failures are converted to
//! an [`Error`] and passed to an [`UnhandledErrorSink`]: the one configured on
//! the operator or scheduler, otherwise the process-wide default from
//! [`crate::defaults`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::defaults;
use crate::error::Error;
use crate::tracing_compat::error;

/// Receives errors raised where no caller can observe them.
pub trait UnhandledErrorSink: Send + Sync {
    /// Handles one error. A panic raised here is swallowed.
    fn handle(&self, error: &Error);
}

impl<F> UnhandledErrorSink for F
where
    F: Fn(&Error) + Send + Sync,
{
    fn handle(&self, error: &Error) {
        self(error);
    }
}

/// Sink that reports through `tracing` at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl UnhandledErrorSink for LogSink {
    fn handle(&self, err: &Error) {
        error!(error = %err, kind = ?err.kind(), "unhandled error in reactive pipeline");
        let _ = err;
    }
}

/// Sink that drops every error.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSink;

impl UnhandledErrorSink for SilentSink {
    fn handle(&self, _error: &Error) {}
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn UnhandledErrorSink>;

/// Sends `error` to `sink`, or to the process-wide sink when `None`.
pub fn report(sink: Option<&SharedSink>, error: &Error) {
    let sink = match sink {
        Some(sink) => Arc::clone(sink),
        None => defaults::unhandled_sink(),
    };
    let _ = catch_unwind(AssertUnwindSafe(|| sink.handle(error)));
}

/// Runs `f`, routing a panic to `sink` instead of unwinding.
///
/// Returns true if `f` completed without panicking.
pub(crate) fn run_guarded(sink: Option<&SharedSink>, f: impl FnOnce()) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            report(sink, &Error::from_panic(payload.as_ref()));
            false
        }
    }
}
