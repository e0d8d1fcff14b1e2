//! Process-wide defaults.
//!
//! Operators that are not handed an explicit sink, scheduler or provider
//! resolve one here. [`install`] sets the defaults once for the process;
//! until then a lazily built set derived from [`ReactiveConfig::from_env`]
//! is used.

use std::sync::{Arc, OnceLock};

use crate::config::{ReactiveConfig, UnhandledResponse};
use crate::error::{Error, ErrorKind, Result};
use crate::scheduler::{
    FrameProvider, ManualFrameProvider, Scheduler, ThreadPoolScheduler, WorkerPool,
};
use crate::time::{SystemTimeProvider, TimeProvider};
use crate::tracing_compat::{debug, warn};
use crate::unhandled::{LogSink, SharedSink, SilentSink};

static INSTALLED: OnceLock<Defaults> = OnceLock::new();
static LAZY: OnceLock<Defaults> = OnceLock::new();

/// The set of process-wide collaborators.
#[derive(Clone)]
pub struct Defaults {
    unhandled_sink: SharedSink,
    thread_pool: Arc<dyn Scheduler>,
    time_provider: Arc<dyn TimeProvider>,
    frame_provider: Arc<dyn FrameProvider>,
    swap_list_capacity: usize,
}

impl Defaults {
    /// Builds defaults from `config`.
    #[must_use]
    pub fn from_config(config: &ReactiveConfig) -> Self {
        let unhandled_sink: SharedSink = match config.unhandled_response {
            UnhandledResponse::Log => Arc::new(LogSink),
            UnhandledResponse::Silent => Arc::new(SilentSink),
        };
        Self {
            unhandled_sink,
            thread_pool: Arc::new(ThreadPoolScheduler::new(Arc::new(WorkerPool::from_config(
                config,
            )))),
            time_provider: Arc::new(SystemTimeProvider::new()),
            frame_provider: Arc::new(ManualFrameProvider::new()),
            swap_list_capacity: config.swap_list_capacity,
        }
    }

    /// Replaces the unhandled-error sink.
    #[must_use]
    pub fn with_unhandled_sink(mut self, sink: SharedSink) -> Self {
        self.unhandled_sink = sink;
        self
    }

    /// Replaces the thread-pool scheduler.
    #[must_use]
    pub fn with_thread_pool(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.thread_pool = scheduler;
        self
    }

    /// Replaces the time provider.
    #[must_use]
    pub fn with_time_provider(mut self, provider: Arc<dyn TimeProvider>) -> Self {
        self.time_provider = provider;
        self
    }

    /// Replaces the frame provider.
    #[must_use]
    pub fn with_frame_provider(mut self, provider: Arc<dyn FrameProvider>) -> Self {
        self.frame_provider = provider;
        self
    }

    /// The unhandled-error sink.
    #[must_use]
    pub fn unhandled_sink(&self) -> &SharedSink {
        &self.unhandled_sink
    }

    /// The thread-pool scheduler.
    #[must_use]
    pub fn thread_pool(&self) -> &Arc<dyn Scheduler> {
        &self.thread_pool
    }

    /// The time provider.
    #[must_use]
    pub fn time_provider(&self) -> &Arc<dyn TimeProvider> {
        &self.time_provider
    }

    /// The frame provider.
    #[must_use]
    pub fn frame_provider(&self) -> &Arc<dyn FrameProvider> {
        &self.frame_provider
    }

    /// Initial swap-list capacity for marshalling observers.
    #[must_use]
    pub fn swap_list_capacity(&self) -> usize {
        self.swap_list_capacity
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self::from_config(&ReactiveConfig::default())
    }
}

impl std::fmt::Debug for Defaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Defaults")
            .field("thread_pool", &self.thread_pool.name())
            .field("swap_list_capacity", &self.swap_list_capacity)
            .finish_non_exhaustive()
    }
}

/// Installs process-wide defaults.
///
/// Succeeds once; later calls fail with [`ErrorKind::AlreadyInstalled`].
pub fn install(defaults: Defaults) -> Result<()> {
    INSTALLED.set(defaults).map_err(|_| {
        Error::new(ErrorKind::AlreadyInstalled).with_message("process defaults already installed")
    })?;
    debug!("process defaults installed");
    Ok(())
}

/// The active defaults: installed ones if any, otherwise the lazy set.
pub fn current() -> &'static Defaults {
    if let Some(installed) = INSTALLED.get() {
        return installed;
    }
    LAZY.get_or_init(|| {
        let config = ReactiveConfig::from_env().unwrap_or_else(|err| {
            warn!(error = %err, "ignoring invalid reactive config from environment");
            let _ = err;
            ReactiveConfig::default()
        });
        Defaults::from_config(&config)
    })
}

/// The active unhandled-error sink.
#[must_use]
pub fn unhandled_sink() -> SharedSink {
    Arc::clone(current().unhandled_sink())
}

/// The active thread-pool scheduler.
#[must_use]
pub fn thread_pool() -> Arc<dyn Scheduler> {
    Arc::clone(current().thread_pool())
}

/// The active time provider.
#[must_use]
pub fn time_provider() -> Arc<dyn TimeProvider> {
    Arc::clone(current().time_provider())
}

/// The active frame provider.
#[must_use]
pub fn frame_provider() -> Arc<dyn FrameProvider> {
    Arc::clone(current().frame_provider())
}
