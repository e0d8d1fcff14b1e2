//! End-to-end tests for the push-to-future bridge.
//!
//! Values arrive from producer threads while the test thread awaits the
//! outcome, either blocking or through `.await`.

#[macro_use]
mod common;

use common::*;
use reflux::{
    CancelKind, CancelReason, CancelToken, Completion, Error, ErrorKind, ObservableExt, Observer,
    Outcome, Subject, ThreadPoolScheduler,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn to_vec_collects_values_pushed_from_another_thread() {
    init_test_logging();
    test_phase!("to_vec_collects_values_pushed_from_another_thread");

    let subject = Subject::<u32>::new();
    let token = CancelToken::new();
    let future = subject.to_vec_async(&token);

    let producer = {
        let subject = subject.clone();
        thread::spawn(move || {
            for i in 0..100 {
                subject.on_next(i);
            }
            subject.on_completed(Completion::Success);
        })
    };

    let outcome = block_on(future);
    producer.join().expect("producer panicked");
    match outcome {
        Outcome::Ok(values) => assert_eq!(values, (0..100).collect::<Vec<_>>()),
        other => panic!("expected values, got {other:?}"),
    }
    test_complete!("to_vec_collects_values_pushed_from_another_thread");
}

#[test]
fn aggregate_over_observe_on_pool() {
    init_test_logging();
    let token = CancelToken::new();
    let future = reflux::from_iter(1..=10u64)
        .observe_on(Arc::new(ThreadPoolScheduler::default()))
        .aggregate_async(0u64, |acc, v| acc + v, |sum| Ok(sum * 2), &token);

    let outcome = future
        .wait_timeout(Duration::from_secs(10))
        .unwrap_or_else(|_| panic!("aggregate timed out"));
    assert!(matches!(outcome, Outcome::Ok(110)));
}

#[test]
fn cancel_from_another_thread_releases_source() {
    init_test_logging();
    test_phase!("cancel_from_another_thread_releases_source");

    let subject = Subject::<u8>::new();
    let token = CancelToken::new();
    let future = subject.last_async(&token);
    subject.on_next(1);
    assert_eq!(subject.observer_count(), 1);

    let canceller = {
        let token = token.clone();
        thread::spawn(move || token.cancel(CancelReason::timeout()))
    };
    let outcome = block_on(future);
    assert!(canceller.join().expect("canceller panicked"));

    match outcome {
        Outcome::Cancelled(reason) => assert_eq!(reason.kind(), CancelKind::Timeout),
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(subject.observer_count(), 0);
}

#[test]
fn parent_cancellation_reaches_child_token() {
    let parent = CancelToken::new();
    let child = parent.child();
    let subject = Subject::<u8>::new();
    let future = subject.to_vec_async(&child);

    parent.cancel(CancelReason::shutdown());
    match future.wait() {
        Outcome::Cancelled(reason) => assert_eq!(reason.kind(), CancelKind::ParentCancelled),
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(subject.observer_count(), 0);
}

#[test]
fn error_resume_fails_the_future_and_unsubscribes() {
    let subject = Subject::<u8>::new();
    let future = subject.to_vec_async(&CancelToken::new());
    subject.on_next(1);
    subject.on_error_resume(Error::user("bad input"));

    match future.wait() {
        Outcome::Err(err) => assert_eq!(err.message(), Some("bad input")),
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(subject.observer_count(), 0);
}

#[test]
fn last_of_empty_sequence_is_no_elements() {
    let future = reflux::from_iter(Vec::<u8>::new()).last_async(&CancelToken::new());
    match block_on(future) {
        Outcome::Err(err) => assert_eq!(err.kind(), ErrorKind::NoElements),
        other => panic!("expected NoElements, got {other:?}"),
    }
}

#[test]
fn already_cancelled_token_never_folds() {
    let token = CancelToken::cancelled(CancelReason::user("gave up"));
    let folds = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let future = {
        let folds = Arc::clone(&folds);
        reflux::from_iter(vec![1, 2, 3]).aggregate_async(
            0,
            move |acc, v| {
                folds.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                acc + v
            },
            Ok,
            &token,
        )
    };

    assert!(future.wait().is_cancelled());
    assert_eq!(folds.load(std::sync::atomic::Ordering::SeqCst), 0);
}
