//! Core of lazyfeed: a demand-driven collector over lazily produced items.
//!
//! A list widget only ever says "I need at least N items". The
//! [`PagingCollector`] decides whether fetching is needed, runs at most one
//! fetch at a time against a [`PagedSource`], and publishes every append and
//! working transition on the designated execution context ([`Runtime`]).

pub mod cancel;
pub mod capability;
pub mod collector;
pub mod error;
pub mod gate;
pub mod hash;
pub mod items;
pub mod observer;
pub mod platform;
pub mod runtime;
pub mod source;

pub use cancel::{CancelToken, CancellationSource, Cancelled};
pub use capability::{ItemSource, RequestCount};
pub use collector::PagingCollector;
pub use error::FetchError;
pub use gate::{AdmissionGate, GatePass};
pub use hash::hash_key;
pub use items::ItemList;
pub use observer::{FeedEvent, Subscription};
pub use platform::{RuntimeScheduler, SharedSpawner};
pub use runtime::{
    DefaultScheduler, DispatchContext, Runtime, RuntimeDropped, RuntimeHandle, UiDelivery,
    UiDispatcher,
};
pub use source::{ItemCursor, PagedSource, SourceError, StreamSource};
