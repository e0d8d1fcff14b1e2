//! Core value types shared across the runtime.
//!
//! - [`Time`]: a logical timestamp driven by a [`TimeProvider`](crate::time::TimeProvider)
//! - [`CancelReason`] / [`CancelKind`]: why a token was cancelled
//! - [`Outcome`]: the three-valued result of an awaited stream summary

pub mod cancel;
pub mod outcome;
pub mod time;

pub use cancel::{CancelKind, CancelReason};
pub use outcome::{Outcome, OutcomeError};
pub use time::Time;
