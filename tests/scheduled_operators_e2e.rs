//! End-to-end tests for operators that run on schedulers and clocks.
//!
//! Uses the manual frame provider and the virtual clock so every step is
//! driven by the test, plus one check against the default wall clock.

#[macro_use]
mod common;

use common::*;
use reflux::{
    emit_once_after, emit_once_after_on, Completion, Disposable, Dispatcher, DispatcherScheduler, ErrorKind,
    FrameProvider, FrameScheduler, ManualFrameProvider, ObservableExt, Observer, Scheduler,
    Subject, ThreadPoolScheduler, TimeProvider, TimerScheduler, Timing, VirtualTimeProvider,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn throttle_pipeline_on_frames() {
    init_test_logging();
    test_phase!("throttle_pipeline_on_frames");

    let frames = Arc::new(ManualFrameProvider::new());
    let subject = Subject::<u32>::new();
    let rec = Recorder::new();
    let sub = subject
        .clone()
        .map(|v| v * 10)
        .filter(|v| *v != 30)
        .throttle_first_by_tick_on(2, frames.clone())
        .expect("window")
        .subscribe(rec.clone())
        .expect("subscribe");

    test_section!("first window");
    subject.on_next(1);
    subject.on_next(2);
    frames.tick();
    assert!(rec.values().is_empty());
    frames.tick();
    assert_eq!(rec.values(), vec![10]);

    test_section!("filtered value leaves the window empty");
    subject.on_next(3);
    frames.tick_n(2);
    assert_eq!(rec.values(), vec![10]);

    test_section!("teardown");
    subject.on_next(4);
    sub.dispose();
    frames.tick_n(4);
    assert_eq!(rec.values(), vec![10]);
    assert_eq!(frames.registered(), 0);
    assert_eq!(subject.observer_count(), 0);
    test_complete!("throttle_pipeline_on_frames");
}

#[test]
fn zero_tick_window_is_rejected() {
    let frames: Arc<dyn FrameProvider> = Arc::new(ManualFrameProvider::new());
    let err = Subject::<u8>::new()
        .throttle_first_by_tick_on(0, frames)
        .err()
        .expect("zero window accepted");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn emit_once_after_on_virtual_clock() {
    init_test_logging();
    let clock = Arc::new(VirtualTimeProvider::new());
    let rec = Recorder::new();
    let _sub = emit_once_after_on("ready", Duration::from_millis(100), clock.clone())
        .map(str::len)
        .subscribe(rec.clone())
        .expect("subscribe");

    clock.advance(Duration::from_millis(99));
    assert!(rec.values().is_empty());
    clock.advance(Duration::from_millis(1));
    assert_eq!(rec.values(), vec![5]);
    assert!(matches!(rec.completion(), Some(Completion::Success)));
    assert_eq!(clock.pending_timers(), 0);
}

#[test]
fn emit_once_after_waits_on_default_wall_clock() {
    init_test_logging();
    test_phase!("emit_once_after_waits_on_default_wall_clock");

    let due = Duration::from_millis(50);
    let rec = Recorder::new();
    let started = Instant::now();
    let _sub = emit_once_after(7u8, due)
        .subscribe(rec.clone())
        .expect("subscribe");

    assert!(rec.values().is_empty());
    assert!(rec.wait_for_completion(Duration::from_secs(5)));
    let elapsed = started.elapsed();
    assert!(elapsed >= due, "delivered after {elapsed:?}");
    assert_eq!(rec.values(), vec![7]);
    assert_eq!(rec.completions(), 1);
    test_complete!("emit_once_after_waits_on_default_wall_clock");
}

#[test]
fn timer_scheduler_fires_in_deadline_order() {
    let clock = Arc::new(VirtualTimeProvider::new());
    let timer = TimerScheduler::new(clock.clone());
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    for (label, ms) in [("c", 30u64), ("a", 10), ("b", 20), ("a2", 10)] {
        let order = Arc::clone(&order);
        let at = clock.clone();
        timer
            .schedule(
                Box::new(move || order.lock().push((label, at.now().as_millis()))),
                Timing::Delay(Duration::from_millis(ms)),
            )
            .expect("schedule");
    }
    let cancelled = {
        let order = Arc::clone(&order);
        timer
            .schedule(
                Box::new(move || order.lock().push(("never", 0))),
                Timing::Delay(Duration::from_millis(15)),
            )
            .expect("schedule")
    };
    cancelled.dispose();

    assert_eq!(clock.advance(Duration::from_millis(30)), 4);
    assert_eq!(
        *order.lock(),
        vec![("a", 10), ("a2", 10), ("b", 20), ("c", 30)]
    );
}

#[test]
fn frame_scheduler_counts_frames() {
    let frames = Arc::new(ManualFrameProvider::new());
    let scheduler = FrameScheduler::new(frames.clone());
    let ran = Arc::new(parking_lot::Mutex::new(Vec::new()));
    {
        let ran = Arc::clone(&ran);
        let at = frames.clone();
        scheduler
            .schedule(
                Box::new(move || ran.lock().push(at.frame_count())),
                Timing::Frames(3),
            )
            .expect("schedule");
    }
    frames.tick_n(2);
    assert!(ran.lock().is_empty());
    frames.tick();
    assert_eq!(*ran.lock(), vec![3]);

    let err = scheduler
        .schedule(Box::new(|| {}), Timing::Delay(Duration::from_millis(1)))
        .err()
        .expect("delay accepted");
    assert_eq!(err.kind(), ErrorKind::UnsupportedTiming);
}

#[test]
fn subscribe_on_pool_observe_on_dispatcher() {
    init_test_logging();
    test_phase!("subscribe_on_pool_observe_on_dispatcher");

    let d = Arc::new(Dispatcher::new());
    let ui: Arc<dyn Scheduler> = Arc::new(DispatcherScheduler::new(Arc::clone(&d)));
    let subscribed_on = Arc::new(parking_lot::Mutex::new(None));
    let source = {
        let subscribed_on = Arc::clone(&subscribed_on);
        reflux::create(move |observer: Arc<dyn Observer<u32>>| {
            *subscribed_on.lock() = Some(thread::current().id());
            for v in 0..5 {
                observer.on_next(v);
            }
            observer.on_completed(Completion::Success);
            Ok(reflux::Subscription::empty())
        })
    };

    let rec = Recorder::new();
    let _sub = source
        .subscribe_on(Arc::new(ThreadPoolScheduler::default()))
        .observe_on(ui)
        .subscribe(rec.clone())
        .expect("subscribe");

    assert!(d.run_until(Duration::from_secs(10), || rec.is_completed()));
    assert_eq!(rec.values(), vec![0, 1, 2, 3, 4]);
    assert_eq!(rec.delivery_threads(), vec![thread::current().id()]);
    assert_ne!(*subscribed_on.lock(), Some(thread::current().id()));
}
