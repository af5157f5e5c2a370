//! Foundation layer for lazyfeed: turns list visibility into count requests.

pub mod demand;

pub use demand::{DemandStrategy, DemandTracker, ListEvent, ListId};
