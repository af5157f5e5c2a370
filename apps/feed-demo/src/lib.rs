//! Scrolls through a simulated paged timeline, loading posts on demand.

pub mod api;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use lazyfeed_core::{FeedEvent, PagingCollector};
use lazyfeed_foundation::{DemandStrategy, DemandTracker, ListId};
use lazyfeed_runtime_std::{StdRuntime, StdRuntimeOptions};

pub use api::{Post, SimulatedApi};

/// Knobs for [`run`].
#[derive(Clone, Debug)]
pub struct FeedDemoOptions {
    pub total_items: usize,
    pub page_size: usize,
    pub page_latency: Duration,
    /// Rows visible at once.
    pub viewport: usize,
    /// Rows scrolled per step.
    pub scroll_step: usize,
    pub strategy: DemandStrategy,
    pub worker_threads: usize,
    /// How long a single scroll step may wait for its items.
    pub step_timeout: Duration,
}

impl Default for FeedDemoOptions {
    fn default() -> Self {
        Self {
            total_items: 60,
            page_size: 8,
            page_latency: Duration::from_millis(40),
            viewport: 6,
            scroll_step: 4,
            strategy: DemandStrategy::default(),
            worker_threads: 2,
            step_timeout: Duration::from_secs(5),
        }
    }
}

impl FeedDemoOptions {
    pub fn with_total_items(mut self, total_items: usize) -> Self {
        self.total_items = total_items;
        self
    }

    pub fn with_page(mut self, page_size: usize, latency: Duration) -> Self {
        self.page_size = page_size;
        self.page_latency = latency;
        self
    }

    /// Scrolling never skips rows: `scroll_step` is clamped to `1..=viewport`.
    pub fn with_viewport(mut self, viewport: usize, scroll_step: usize) -> Self {
        self.viewport = viewport.max(1);
        self.scroll_step = scroll_step.clamp(1, self.viewport);
        self
    }

    pub fn with_strategy(mut self, strategy: DemandStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads.max(1);
        self
    }

    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }
}

/// What a demo run observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedSummary {
    pub loaded: usize,
    pub scroll_steps: usize,
    pub fetches: usize,
    pub last_demand: usize,
}

/// Scrolls from the top of the timeline to its end, one step at a time.
///
/// Must run on the thread that drains the UI queue; it pumps the runtime
/// itself between scroll steps.
pub fn run(options: FeedDemoOptions) -> anyhow::Result<FeedSummary> {
    let runtime = StdRuntime::with_options(
        StdRuntimeOptions::default().with_worker_threads(options.worker_threads),
    )
    .context("starting the worker pool")?;

    let api = SimulatedApi::new(options.total_items, options.page_size, options.page_latency);
    let collector = Arc::new(PagingCollector::new(&api, runtime.dispatch_context()));

    let fetches = Arc::new(AtomicUsize::new(0));
    let working = Arc::new(AtomicBool::new(false));
    let _progress = {
        let fetches = Arc::clone(&fetches);
        let working = Arc::clone(&working);
        collector.subscribe(move |event: &FeedEvent<'_, Post>| match event {
            FeedEvent::WorkingChanged(true) => {
                log::info!("loading more posts");
                working.store(true, Ordering::SeqCst);
            }
            FeedEvent::WorkingChanged(false) => {
                working.store(false, Ordering::SeqCst);
                fetches.fetch_add(1, Ordering::SeqCst);
            }
            FeedEvent::ItemAdded { index, item } => log::debug!("row {index}: {}", item.title),
        })
    };

    let list = ListId::from_key("feed-demo/timeline");
    let mut tracker = DemandTracker::new(options.strategy);
    tracker.attach(list, &collector);

    let mut first_visible = 0;
    let mut scroll_steps = 0;
    while first_visible < api.total_items() {
        let wanted = tracker
            .last_requested(list)
            .unwrap_or(0)
            .min(api.total_items());
        if !runtime.pump_until(options.step_timeout, || collector.len() >= wanted) {
            bail!(
                "timeline stalled at {} of {wanted} posts",
                collector.len()
            );
        }

        let visible = first_visible..(first_visible + options.viewport).min(collector.len());
        if visible.is_empty() {
            bail!(
                "scrolled to row {first_visible} with only {} posts loaded",
                collector.len()
            );
        }
        log::info!(
            "showing rows {}..{} of {} loaded",
            visible.start,
            visible.end,
            collector.len()
        );
        tracker.range_visible(list, visible);
        first_visible += options.scroll_step;
        scroll_steps += 1;
    }

    collector.dispose();
    if !runtime.pump_until(options.step_timeout, || !working.load(Ordering::SeqCst)) {
        log::warn!("fetch still running after teardown");
    }

    Ok(FeedSummary {
        loaded: collector.len(),
        scroll_steps,
        fetches: fetches.load(Ordering::SeqCst),
        last_demand: tracker.last_requested(list).unwrap_or(0),
    })
}

#[cfg(test)]
#[path = "tests/run_tests.rs"]
mod tests;
