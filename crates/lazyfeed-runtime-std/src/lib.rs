//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides concrete implementations of the platform
//! abstraction traits defined in `lazyfeed-core`. Applications construct a
//! [`StdRuntime`] on their UI thread, hand its [`DispatchContext`] to
//! collectors, and drain it from their event loop.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use futures_executor::ThreadPool;
use lazyfeed_core::{DispatchContext, Runtime, RuntimeHandle, RuntimeScheduler, SharedSpawner};

/// Upper bound on a single wait in [`StdRuntime::pump_until`], so conditions
/// that change without UI work still get re-checked.
const PUMP_SLICE: Duration = Duration::from_millis(5);

/// Scheduler that wakes a waiting UI loop through a condition variable.
pub struct StdScheduler {
    frame_requested: Mutex<bool>,
    frame_signal: Condvar,
    frame_waker: RwLock<Option<Arc<dyn Fn() + Send + Sync + 'static>>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            frame_requested: Mutex::new(false),
            frame_signal: Condvar::new(),
            frame_waker: RwLock::new(None),
        }
    }

    /// Returns whether a frame has been requested since the last call.
    pub fn take_frame_request(&self) -> bool {
        std::mem::take(&mut *self.requested())
    }

    /// Blocks until a frame is requested or `timeout` elapses.
    ///
    /// Consumes the request; returns `false` on timeout.
    pub fn wait_for_frame(&self, timeout: Duration) -> bool {
        let requested = self.requested();
        let (mut requested, _) = self
            .frame_signal
            .wait_timeout_while(requested, timeout, |requested| !*requested)
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *requested)
    }

    /// Registers a waker that will be invoked whenever a new frame is scheduled.
    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self
            .frame_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    /// Clears any registered frame waker.
    pub fn clear_frame_waker(&self) {
        *self
            .frame_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn requested(&self) -> std::sync::MutexGuard<'_, bool> {
        self.frame_requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn wake(&self) {
        let waker = self
            .frame_waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field("frame_requested", &*self.requested())
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_frame(&self) {
        *self.requested() = true;
        self.frame_signal.notify_all();
        self.wake();
    }
}

/// Options for [`StdRuntime`].
#[derive(Clone, Debug)]
pub struct StdRuntimeOptions {
    /// Worker threads running fetch tasks. Fetches await rather than block,
    /// so a small pool serves many collectors.
    pub worker_threads: usize,
    pub thread_name_prefix: String,
}

impl Default for StdRuntimeOptions {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            thread_name_prefix: "lazyfeed-worker-".to_string(),
        }
    }
}

impl StdRuntimeOptions {
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads.max(1);
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

/// Convenience container bundling the scheduler, UI runtime and worker pool.
///
/// Must be created on the thread that will call [`StdRuntime::drain_ui`].
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    runtime: Runtime,
    workers: ThreadPool,
    shutdown: Arc<AtomicBool>,
}

impl StdRuntime {
    /// Creates a runtime with [`StdRuntimeOptions::default`].
    pub fn new() -> io::Result<Self> {
        Self::with_options(StdRuntimeOptions::default())
    }

    pub fn with_options(options: StdRuntimeOptions) -> io::Result<Self> {
        let workers = ThreadPool::builder()
            .pool_size(options.worker_threads.max(1))
            .name_prefix(options.thread_name_prefix.clone())
            .create()?;
        log::debug!(
            "starting std runtime with {} worker threads",
            options.worker_threads
        );
        let scheduler = Arc::new(StdScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        Ok(Self {
            scheduler,
            runtime,
            workers,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Returns the [`lazyfeed_core::Runtime`] configured with the standard scheduler.
    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    /// Returns a handle to the runtime.
    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    /// Returns the dispatcher plus worker pool that collectors run on.
    pub fn dispatch_context(&self) -> DispatchContext {
        let spawner: SharedSpawner = Arc::new(self.workers.clone());
        self.runtime.handle().dispatch_context(spawner)
    }

    /// Returns the scheduler implementation.
    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Returns whether a frame was requested since the last poll.
    pub fn take_frame_request(&self) -> bool {
        self.scheduler.take_frame_request()
    }

    /// Registers a waker to be called when the runtime schedules a new frame.
    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_frame_waker(waker);
    }

    /// Clears any previously registered frame waker.
    pub fn clear_frame_waker(&self) {
        self.scheduler.clear_frame_waker();
    }

    /// Runs every task queued for the UI thread.
    pub fn drain_ui(&self) {
        self.runtime.handle().drain_ui();
    }

    /// Drains the UI queue until `done` holds or `timeout` elapses.
    ///
    /// Sleeps on the scheduler between drains, so background fetches make
    /// progress without busy-waiting. Returns the final value of `done`.
    pub fn pump_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.drain_ui();
            if done() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline || self.shutdown.load(Ordering::SeqCst) {
                return done();
            }
            self.scheduler.wait_for_frame((deadline - now).min(PUMP_SLICE));
        }
    }

    /// Drains the UI queue for `duration`, regardless of progress.
    pub fn pump_for(&self, duration: Duration) {
        self.pump_until(duration, || false);
    }

    /// Makes pending and future [`pump_until`](Self::pump_until) calls return.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.scheduler.schedule_frame();
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("shutdown", &self.shutdown.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/std_runtime_tests.rs"]
mod tests;
