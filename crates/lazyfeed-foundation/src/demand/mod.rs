//! Demand propagation for lazy lists.
//!
//! A list reports which positions it shows; [`DemandTracker`] converts that
//! into non-decreasing "at least N items" requests against the list's item
//! source, following a [`DemandStrategy`].

mod strategy;
mod tracker;

pub use strategy::DemandStrategy;
pub use tracker::{DemandTracker, ListEvent, ListId};
