//! Closure-backed observer.

use super::Observer;
use crate::error::Error;
use crate::notification::Completion;
use crate::unhandled;

type NextFn<T> = Box<dyn Fn(T) + Send + Sync>;
type ErrorFn = Box<dyn Fn(Error) + Send + Sync>;
type CompletedFn = Box<dyn Fn(Completion) + Send + Sync>;

/// Observer assembled from closures.
///
/// A missing error handler sends recoverable errors to the process-wide
/// sink. A missing completion handler does the same for failures.
pub struct FnObserver<T> {
    on_next: NextFn<T>,
    on_error_resume: Option<ErrorFn>,
    on_completed: Option<CompletedFn>,
}

impl<T> FnObserver<T> {
    /// Creates an observer calling `on_next` for each value.
    pub fn new(on_next: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            on_next: Box::new(on_next),
            on_error_resume: None,
            on_completed: None,
        }
    }

    /// Handles recoverable errors with `f`.
    #[must_use]
    pub fn with_error_resume(mut self, f: impl Fn(Error) + Send + Sync + 'static) -> Self {
        self.on_error_resume = Some(Box::new(f));
        self
    }

    /// Handles completion with `f`.
    #[must_use]
    pub fn with_completed(mut self, f: impl Fn(Completion) + Send + Sync + 'static) -> Self {
        self.on_completed = Some(Box::new(f));
        self
    }
}

impl<T> Observer<T> for FnObserver<T> {
    fn on_next(&self, value: T) {
        (self.on_next)(value);
    }

    fn on_error_resume(&self, error: Error) {
        match &self.on_error_resume {
            Some(f) => f(error),
            None => unhandled::report(None, &error),
        }
    }

    fn on_completed(&self, completion: Completion) {
        match (&self.on_completed, completion) {
            (Some(f), completion) => f(completion),
            (None, Completion::Failure(error)) => unhandled::report(None, &error),
            (None, Completion::Success) => {}
        }
    }
}

impl<T> std::fmt::Debug for FnObserver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnObserver")
            .field("on_error_resume", &self.on_error_resume.is_some())
            .field("on_completed", &self.on_completed.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn closures_receive_calls() {
        let values = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(Mutex::new(0));
        let done = Arc::new(Mutex::new(false));
        let (v, e, d) = (values.clone(), errors.clone(), done.clone());

        let observer = FnObserver::new(move |x: u8| v.lock().push(x))
            .with_error_resume(move |_| *e.lock() += 1)
            .with_completed(move |c| *d.lock() = c.is_success());

        observer.on_next(1);
        observer.on_error_resume(Error::user("soft"));
        observer.on_next(2);
        observer.on_completed(Completion::Success);

        assert_eq!(*values.lock(), vec![1, 2]);
        assert_eq!(*errors.lock(), 1);
        assert!(*done.lock());
    }
}
