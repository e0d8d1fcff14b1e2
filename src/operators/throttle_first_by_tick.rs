//! First value per window of frame ticks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::disposable::{CompositeDisposable, Disposable, SingleAssignmentDisposable, Subscription};
use crate::error::{Error, Result};
use crate::notification::Completion;
use crate::observable::{Observable, ObservableExt, Observer};
use crate::scheduler::{FrameControl, FrameProvider};

/// Emits at most one value per `count` ticks of a [`FrameProvider`].
///
/// Ticks are counted from subscription. On every `count`-th tick the first
/// value seen since the previous window (if any) is emitted. Completion drops
/// a pending value.
pub struct ThrottleFirstByTick<S> {
    source: S,
    count: u64,
    provider: Arc<dyn FrameProvider>,
}

impl<S> ThrottleFirstByTick<S> {
    pub(crate) fn new(source: S, count: u64, provider: Arc<dyn FrameProvider>) -> Result<Self> {
        if count == 0 {
            return Err(Error::invalid_argument(
                "throttle_first_by_tick requires a window of at least one tick",
            ));
        }
        Ok(Self {
            source,
            count,
            provider,
        })
    }
}

impl<S, T> Observable<T> for ThrottleFirstByTick<S>
where
    S: Observable<T>,
    T: Send + 'static,
{
    fn subscribe_core(&self, observer: Arc<dyn Observer<T>>) -> Result<Subscription> {
        let shared = Arc::new(ThrottleShared {
            downstream: observer,
            count: self.count,
            window: Mutex::new(Window {
                pending: None,
                ticks: 0,
            }),
            done: AtomicBool::new(false),
            ticker: SingleAssignmentDisposable::new(),
        });

        let on_tick = Arc::clone(&shared);
        let handle = self
            .provider
            .register(Box::new(move |_frame| on_tick.tick()))?;
        shared.ticker.set(Subscription::new(handle))?;

        let upstream = match self.source.subscribe(Arc::new(ThrottleObserver {
            shared: Arc::clone(&shared),
        })) {
            Ok(upstream) => upstream,
            Err(error) => {
                shared.dispose();
                return Err(error);
            }
        };

        let group = CompositeDisposable::new();
        group.add(upstream);
        group.add(Subscription::from_arc(shared));
        Ok(Subscription::new(group))
    }
}

struct Window<T> {
    pending: Option<T>,
    ticks: u64,
}

struct ThrottleShared<T> {
    downstream: Arc<dyn Observer<T>>,
    count: u64,
    window: Mutex<Window<T>>,
    done: AtomicBool,
    ticker: SingleAssignmentDisposable,
}

impl<T> ThrottleShared<T> {
    fn tick(&self) -> FrameControl {
        if self.done.load(Ordering::Acquire) {
            return FrameControl::Stop;
        }
        let emit = {
            let mut window = self.window.lock();
            window.ticks += 1;
            if window.ticks % self.count == 0 {
                window.pending.take()
            } else {
                None
            }
        };
        if let Some(value) = emit {
            self.downstream.on_next(value);
        }
        FrameControl::Continue
    }
}

impl<T: Send> Disposable for ThrottleShared<T> {
    fn dispose(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        self.window.lock().pending = None;
        self.ticker.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

struct ThrottleObserver<T> {
    shared: Arc<ThrottleShared<T>>,
}

impl<T: Send> Observer<T> for ThrottleObserver<T> {
    fn on_next(&self, value: T) {
        if self.shared.done.load(Ordering::Acquire) {
            return;
        }
        let mut window = self.shared.window.lock();
        if window.pending.is_none() {
            window.pending = Some(value);
        }
    }

    fn on_error_resume(&self, error: Error) {
        self.shared.downstream.on_error_resume(error);
    }

    fn on_completed(&self, completion: Completion) {
        self.shared.dispose();
        self.shared.downstream.on_completed(completion);
    }
}
