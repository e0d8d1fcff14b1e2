//! Reflux: a push-based reactive stream runtime with disposal-managed
//! lifetimes and pluggable schedulers.
//!
//! # Overview
//!
//! A source ([`Observable`]) pushes values, recoverable errors and a single
//! terminal [`Completion`] into an [`Observer`]. Subscribing returns a
//! [`Subscription`]; disposing it tears the pipeline down. Operators compose
//! sources, and scheduling operators move delivery onto an execution context
//! through the [`Scheduler`] seam.
//!
//! # Core Guarantees
//!
//! - **Serialized marshalling**: downstream of `observe_on`, callbacks never
//!   overlap and arrive in push order. Elsewhere delivery runs on whichever
//!   thread pushed, so a [`Subject`] fed from several threads, or a frame tick
//!   racing an upstream error, may call an observer concurrently
//! - **Terminal once**: at most one completion per subscription, nothing after it
//! - **Idempotent teardown**: disposing twice is a no-op, disposing late is safe
//! - **Panics stay put**: a panicking callback on a scheduled path is routed to
//!   the unhandled-error sink and never unwinds through a scheduler
//!
//! # Module Structure
//!
//! - [`observable`]: Observer/Observable contracts, subjects and sources
//! - [`operators`]: Map, filter, scheduling operators and awaitable terminals
//! - [`scheduler`]: Scheduler trait and its immediate, pool, timer, frame and
//!   dispatcher implementations
//! - [`time`]: Wall-clock and virtual time providers
//! - [`disposable`]: Subscription handles and disposal containers
//! - [`cancel`]: Cancellation tokens
//! - [`future`]: Outcome futures bridging streams into `async`
//! - [`defaults`]: Process-wide defaults
//! - [`config`]: Environment-driven configuration
//! - [`error`]: Error types

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod cancel;
pub mod config;
pub mod defaults;
pub mod disposable;
pub mod error;
pub mod future;
pub mod notification;
pub mod observable;
pub mod operators;
pub mod scheduler;
pub mod swap_list;
pub mod time;
pub mod tracing_compat;
pub mod types;
pub mod unhandled;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-exports for convenient access to core types
pub use cancel::{CancelRegistration, CancelToken};
pub use config::{ReactiveConfig, UnhandledResponse};
pub use defaults::Defaults;
pub use disposable::{
    ActionDisposable, CompositeDisposable, Disposable, SingleAssignmentDisposable, Subscription,
};
pub use error::{Error, ErrorCategory, ErrorKind, Result, ResultExt};
pub use future::{OutcomeFuture, ResultSlot};
pub use notification::{Completion, Notification};
pub use observable::{
    create, from_iter, FnObserver, Observable, ObservableExt, Observer, Subject,
};
pub use operators::{emit_once, emit_once_after, emit_once_after_on};
pub use scheduler::{
    DispatchPriority, Dispatcher, DispatcherScheduler, FrameProvider, FrameScheduler,
    ImmediateScheduler, ManualFrameProvider, PoolOptions, ScheduleHandle, Scheduler,
    ThreadPoolScheduler, TimerScheduler, Timing, WorkerPool,
};
pub use time::{SystemTimeProvider, TimeProvider, VirtualTimeProvider};
pub use types::{CancelKind, CancelReason, Outcome, Time};
pub use unhandled::{SharedSink, UnhandledErrorSink};
