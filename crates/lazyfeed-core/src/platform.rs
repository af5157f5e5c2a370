//! Platform abstraction traits for lazyfeed runtime services.
//!
//! These traits allow the core to delegate UI wake-ups and background
//! execution to the host platform, so the collector never depends on a
//! particular threading model.

use std::sync::Arc;

use futures_task::Spawn;

/// Wakes the host's UI loop when work is queued for the designated context.
///
/// Implementations must be safe to call from any thread; background fetches
/// call this after every posted mutation.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host drain the UI queue soon.
    fn schedule_frame(&self);
}

/// Executor used for fire-and-forget fetch tasks.
///
/// Any `futures` spawner works; `lazyfeed-runtime-std` provides a thread pool.
pub type SharedSpawner = Arc<dyn Spawn + Send + Sync>;
