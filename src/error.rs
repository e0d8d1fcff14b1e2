//! Error types and error handling strategy for reflux.
//!
//! Errors flow through a pipeline in two shapes:
//!
//! - As **values**: a recoverable error travels through `on_error_resume`, a
//!   terminal failure through `Completion::Failure`. Both carry an [`Error`],
//!   which is cheap to clone so one failure can fan out to many observers.
//! - As **results**: synchronous call paths (subscribe, schedule, assign)
//!   return [`Result`] to their immediate caller.
//!
//! Panics raised by user callbacks on scheduled paths never unwind through a
//! scheduler. They are caught at the delivery site, converted with
//! [`Error::from_panic`] and handed to the unhandled-error sink.
//!
//! # Error Categories
//!
//! - **Stream**: errors carried by notifications
//! - **Scheduling**: a scheduler refused or could not run work
//! - **Disposal**: misuse of single-assignment slots
//! - **Cancellation**: an awaited result was cancelled
//! - **Configuration**: invalid configuration or defaults already installed
//! - **Internal**: runtime bugs and invalid states
//! - **User**: errors raised by application code

use core::fmt;
use std::any::Any;
use std::sync::Arc;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Stream ===
    /// An observer callback panicked during delivery.
    ObserverPanicked,
    /// A sequence completed without producing the element an operator needed.
    NoElements,

    // === Scheduling ===
    /// The scheduler cannot honour the requested timing.
    UnsupportedTiming,
    /// The scheduler (or the provider behind it) has shut down.
    SchedulerShutdown,
    /// The scheduler could not hand work to its execution context.
    ScheduleFailed,

    // === Disposal ===
    /// A single-assignment slot was assigned twice.
    AlreadyAssigned,

    // === Cancellation ===
    /// Operation was cancelled.
    Cancelled,

    // === Configuration ===
    /// A configuration value failed to parse or is out of range.
    InvalidConfig,
    /// An operator argument is out of range.
    InvalidArgument,
    /// Process-wide defaults were already installed.
    AlreadyInstalled,

    // === Internal ===
    /// Internal runtime error (bug).
    Internal,

    // === User ===
    /// User-provided error.
    User,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ObserverPanicked | Self::NoElements => ErrorCategory::Stream,
            Self::UnsupportedTiming | Self::SchedulerShutdown | Self::ScheduleFailed => {
                ErrorCategory::Scheduling
            }
            Self::AlreadyAssigned => ErrorCategory::Disposal,
            Self::Cancelled => ErrorCategory::Cancellation,
            Self::InvalidConfig | Self::InvalidArgument | Self::AlreadyInstalled => {
                ErrorCategory::Configuration
            }
            Self::Internal => ErrorCategory::Internal,
            Self::User => ErrorCategory::User,
        }
    }
}

/// High-level error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Errors carried by stream notifications.
    Stream,
    /// Scheduler failures.
    Scheduling,
    /// Disposable misuse.
    Disposal,
    /// Cancellation.
    Cancellation,
    /// Configuration and argument errors.
    Configuration,
    /// Internal runtime errors.
    Internal,
    /// User-originated errors.
    User,
}

/// The main error type for reflux operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Creates a user error with a message.
    #[must_use]
    pub fn user(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::User).with_message(msg)
    }

    /// Converts a caught panic payload into an [`ErrorKind::ObserverPanicked`] error.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::new(ErrorKind::ObserverPanicked).with_message(message)
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Returns true if this error represents cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// Returns true if this error wraps a panic from user code.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self.kind, ErrorKind::ObserverPanicked)
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns true when both errors share kind and message.
    ///
    /// Sources are not compared; they are opaque trait objects.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message
    }

    /// Creates an unsupported-timing error naming the scheduler.
    #[must_use]
    pub fn unsupported_timing(scheduler: &str, timing: impl fmt::Debug) -> Self {
        Self::new(ErrorKind::UnsupportedTiming)
            .with_message(format!("{scheduler} cannot schedule {timing:?}"))
    }

    /// Creates an invalid-argument error.
    #[must_use]
    pub fn invalid_argument(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument).with_message(detail)
    }

    /// Creates an internal error (runtime bug).
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_message(detail)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorKind::ScheduleFailed)
            .with_message(e.to_string())
            .with_source(e)
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Attach a context message on error.
    fn context(self, msg: impl Into<String>) -> Result<T>;
    /// Attach context message computed lazily on error.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for core::result::Result<T, E> {
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_message(msg))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().with_message(f()))
    }
}

/// A specialized Result type for reflux operations.
pub type Result<T> = core::result::Result<T, Error>;
