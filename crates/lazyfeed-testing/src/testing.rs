use std::time::Duration;

use lazyfeed_core::{DispatchContext, PagedSource, PagingCollector, RuntimeHandle};
use lazyfeed_runtime_std::{StdRuntime, StdRuntimeOptions};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Headless harness for exercising collectors in tests.
///
/// `FeedTestRule` owns a [`StdRuntime`] whose UI queue is drained on the
/// test thread, so the test thread plays the designated execution context
/// while fetches run on the worker pool.
pub struct FeedTestRule {
    runtime: StdRuntime,
    timeout: Duration,
}

impl FeedTestRule {
    /// Create a rule with a small multi-threaded worker pool.
    pub fn new() -> Self {
        Self::with_options(
            StdRuntimeOptions::default()
                .with_worker_threads(4)
                .with_thread_name_prefix("lazyfeed-test-"),
        )
    }

    pub fn with_options(options: StdRuntimeOptions) -> Self {
        let runtime = StdRuntime::with_options(options)
            .unwrap_or_else(|err| panic!("failed to start test worker pool: {err}"));
        Self {
            runtime,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override how long [`pump_until`](Self::pump_until) waits before failing.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn context(&self) -> DispatchContext {
        self.runtime.dispatch_context()
    }

    pub fn runtime(&self) -> &StdRuntime {
        &self.runtime
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.runtime_handle()
    }

    /// Build a collector over `source` bound to this rule's runtime.
    pub fn collector<T, S>(&self, source: &S) -> PagingCollector<T>
    where
        T: Send + Sync + 'static,
        S: PagedSource<T> + ?Sized,
    {
        PagingCollector::new(source, self.context())
    }

    /// Drain UI work until `condition` holds.
    ///
    /// Panics with `what` in the message if the condition is still false
    /// after the rule's timeout.
    pub fn pump_until(&self, what: &str, condition: impl FnMut() -> bool) {
        if !self.runtime.pump_until(self.timeout, condition) {
            panic!("pump_until timed out after {:?} waiting for {what}", self.timeout);
        }
    }

    /// Drain UI work for `duration` without a stop condition.
    ///
    /// Used to give stray fetch tasks a chance to show up before asserting
    /// that they did not happen.
    pub fn pump_for(&self, duration: Duration) {
        self.runtime.pump_for(duration);
    }

    pub fn drain_ui(&self) {
        self.runtime.drain_ui();
    }
}

impl Default for FeedTestRule {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// `FeedTestRule`.
pub fn run_feed_test<R>(f: impl FnOnce(&FeedTestRule) -> R) -> R {
    let rule = FeedTestRule::new();
    f(&rule)
}

#[cfg(test)]
#[path = "tests/testing_tests.rs"]
mod tests;
