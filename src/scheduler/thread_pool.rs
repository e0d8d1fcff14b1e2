//! Scheduler over an injected task pool.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_queue::SegQueue;
use parking_lot::{Condvar, Mutex};

use super::{ScheduleHandle, Scheduler, Timing, Work};
use crate::config::ReactiveConfig;
use crate::error::{Error, ErrorKind, Result, ResultExt};
use crate::tracing_compat::{debug, trace};
use crate::unhandled::{self, SharedSink};

/// Executes work on some background thread.
///
/// Thread management belongs to the pool; the scheduler only hands it jobs.
pub trait TaskPool: Send + Sync {
    /// Queues `work` for execution.
    fn execute(&self, work: Work) -> Result<()>;
}

/// Tuning for a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Worker thread name prefix; threads are named `{prefix}-{n}`.
    pub thread_name_prefix: String,
    /// Worker stack size in bytes.
    pub stack_size: usize,
    /// Upper bound on live workers.
    pub max_threads: usize,
    /// Idle time after which a worker exits.
    pub idle_timeout: Duration,
}

impl PoolOptions {
    /// Options taken from the pool fields of `config`.
    #[must_use]
    pub fn from_config(config: &ReactiveConfig) -> Self {
        Self {
            thread_name_prefix: config.pool_thread_name_prefix.clone(),
            stack_size: config.pool_thread_stack_size,
            max_threads: config.pool_max_threads.max(1),
            idle_timeout: config.pool_idle_timeout,
        }
    }
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::from_config(&ReactiveConfig::default())
    }
}

struct Workers {
    active: usize,
    idle: usize,
}

struct PoolInner {
    queue: SegQueue<Work>,
    workers: Mutex<Workers>,
    wake: Condvar,
    shutdown: AtomicBool,
    next_id: AtomicUsize,
    options: PoolOptions,
}

/// Pool of reusable worker threads fed from a lock-free FIFO.
///
/// Workers are spawned lazily, only when a job arrives and no worker is
/// parked, up to `max_threads`. A worker that sees no job for `idle_timeout`
/// exits. Shutdown rejects new jobs; workers drain what is queued and exit.
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    /// Creates a pool with no threads running yet.
    #[must_use]
    pub fn new(options: PoolOptions) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                queue: SegQueue::new(),
                workers: Mutex::new(Workers { active: 0, idle: 0 }),
                wake: Condvar::new(),
                shutdown: AtomicBool::new(false),
                next_id: AtomicUsize::new(0),
                options,
            }),
        }
    }

    /// Creates a pool from the pool fields of `config`.
    #[must_use]
    pub fn from_config(config: &ReactiveConfig) -> Self {
        Self::new(PoolOptions::from_config(config))
    }

    /// Number of live worker threads.
    #[must_use]
    pub fn active_threads(&self) -> usize {
        self.inner.workers.lock().active
    }

    /// Number of jobs waiting for a worker.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.queue.len()
    }

    /// Returns true once [`shutdown`](Self::shutdown) ran.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Rejects new jobs and wakes parked workers so they can exit.
    pub fn shutdown(&self) {
        if self.inner.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        let _guard = self.inner.workers.lock();
        self.inner.wake.notify_all();
        debug!(pending = self.inner.queue.len(), "worker pool shutting down");
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(PoolOptions::default())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("active_threads", &self.active_threads())
            .field("pending", &self.pending())
            .field("max_threads", &self.inner.options.max_threads)
            .finish()
    }
}

impl TaskPool for WorkerPool {
    fn execute(&self, work: Work) -> Result<()> {
        if self.is_shutdown() {
            return Err(Error::new(ErrorKind::SchedulerShutdown)
                .with_message("worker pool has shut down"));
        }
        self.inner.queue.push(work);

        let spawn = {
            let mut workers = self.inner.workers.lock();
            if workers.idle > 0 {
                self.inner.wake.notify_one();
                false
            } else if workers.active < self.inner.options.max_threads {
                workers.active += 1;
                true
            } else {
                false
            }
        };
        if spawn {
            spawn_worker(&self.inner)?;
        }
        Ok(())
    }
}

fn spawn_worker(inner: &Arc<PoolInner>) -> Result<()> {
    let id = inner.next_id.fetch_add(1, Ordering::Relaxed);
    let name = format!("{}-{id}", inner.options.thread_name_prefix);
    let worker = Arc::clone(inner);
    let spawned = std::thread::Builder::new()
        .name(name)
        .stack_size(inner.options.stack_size)
        .spawn(move || worker_loop(&worker));
    match spawned {
        Ok(_) => {
            trace!(id, "pool worker started");
            Ok(())
        }
        Err(err) => {
            let remaining = {
                let mut workers = inner.workers.lock();
                workers.active -= 1;
                workers.active
            };
            // With other workers alive the queued job still runs.
            if remaining > 0 {
                Ok(())
            } else {
                Err::<(), _>(err).context("spawning pool worker")
            }
        }
    }
}

fn worker_loop(inner: &PoolInner) {
    loop {
        if let Some(work) = inner.queue.pop() {
            unhandled::run_guarded(None, work);
            continue;
        }

        let mut workers = inner.workers.lock();
        // Re-checked under the lock: execute() pushes before it locks.
        if !inner.queue.is_empty() {
            continue;
        }
        if inner.shutdown.load(Ordering::Acquire) {
            workers.active -= 1;
            break;
        }
        workers.idle += 1;
        let timed_out = inner
            .wake
            .wait_for(&mut workers, inner.options.idle_timeout)
            .timed_out();
        workers.idle -= 1;
        if timed_out && inner.queue.is_empty() {
            workers.active -= 1;
            break;
        }
    }
    trace!("pool worker exiting");
}

/// Runs work on a [`TaskPool`].
///
/// Every job runs under `catch_unwind`; panics go to the scheduler's sink.
#[derive(Clone)]
pub struct ThreadPoolScheduler {
    pool: Arc<dyn TaskPool>,
    sink: Option<SharedSink>,
}

impl ThreadPoolScheduler {
    /// Creates a scheduler over `pool`.
    #[must_use]
    pub fn new(pool: Arc<dyn TaskPool>) -> Self {
        Self { pool, sink: None }
    }

    /// Reports panics from scheduled work to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl Default for ThreadPoolScheduler {
    fn default() -> Self {
        Self::new(Arc::new(WorkerPool::default()))
    }
}

impl Scheduler for ThreadPoolScheduler {
    fn schedule(&self, work: Work, timing: Timing) -> Result<ScheduleHandle> {
        if !matches!(timing, Timing::Now | Timing::Priority(_)) {
            return Err(Error::unsupported_timing(self.name(), timing));
        }

        let handle = ScheduleHandle::new();
        let gate = handle.clone();
        let sink = self.sink.clone();
        self.pool.execute(Box::new(move || {
            if gate.try_begin() {
                unhandled::run_guarded(sink.as_ref(), work);
            }
        }))?;
        trace!("queued work on task pool");
        Ok(handle)
    }

    fn name(&self) -> &'static str {
        "ThreadPoolScheduler"
    }
}

impl std::fmt::Debug for ThreadPoolScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPoolScheduler").finish_non_exhaustive()
    }
}
