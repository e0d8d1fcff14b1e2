//! Materialized observer calls.
//!
//! A [`Notification`] records one of the three observer calls as a value so
//! it can be buffered and replayed on another execution context.

use crate::error::Error;
use crate::observable::Observer;

/// How a sequence ended.
#[derive(Debug, Clone)]
pub enum Completion {
    /// The sequence finished normally.
    Success,
    /// The sequence terminated with an error.
    Failure(Error),
}

impl Completion {
    /// Returns true for [`Completion::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns the failure, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        match self {
            Self::Success => None,
            Self::Failure(e) => Some(e),
        }
    }
}

impl From<Result<(), Error>> for Completion {
    fn from(result: Result<(), Error>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(e) => Self::Failure(e),
        }
    }
}

/// One observer call, captured as data.
#[derive(Debug, Clone)]
pub enum Notification<T> {
    /// A value, delivered through `on_next`.
    Next(T),
    /// A recoverable error, delivered through `on_error_resume`.
    ErrorResume(Error),
    /// The terminal signal, delivered through `on_completed`.
    Completed(Completion),
}

impl<T> Notification<T> {
    /// Replays this notification on `observer`.
    pub fn accept(self, observer: &dyn Observer<T>) {
        match self {
            Self::Next(value) => observer.on_next(value),
            Self::ErrorResume(error) => observer.on_error_resume(error),
            Self::Completed(completion) => observer.on_completed(completion),
        }
    }

    /// Returns true for [`Notification::Completed`].
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}
