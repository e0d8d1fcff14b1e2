//! Cooperative cancellation for awaited stream results.
//!
//! A [`CancelToken`] is a cloneable handle onto shared cancellation state.
//! Anyone holding a clone can request cancellation; listeners registered via
//! [`CancelToken::on_cancel`] are invoked exactly once, on the thread that
//! requested it. The bridge in [`crate::future`] uses this to dispose a
//! subscription and resolve its future as cancelled.

pub mod token;

pub use token::{CancelListener, CancelRegistration, CancelToken};
