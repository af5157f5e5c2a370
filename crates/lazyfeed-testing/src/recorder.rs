//! Observers that record what a collector or tracker was told.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use lazyfeed_core::{FeedEvent, ItemSource, PagingCollector, RequestCount, Subscription};

/// Owned copy of a [`FeedEvent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedEvent<T> {
    Working(bool),
    Added { index: usize, item: T },
}

struct Recorded<T> {
    event: RecordedEvent<T>,
    thread: ThreadId,
}

/// Subscribes to a collector and keeps every event with the thread it
/// was delivered on. Unsubscribes when dropped.
pub struct EventRecorder<T> {
    log: Arc<Mutex<Vec<Recorded<T>>>>,
    _subscription: Subscription,
}

impl<T> EventRecorder<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn attach(collector: &PagingCollector<T>) -> Self {
        let log: Arc<Mutex<Vec<Recorded<T>>>> = Arc::default();
        let sink = Arc::clone(&log);
        let subscription = collector.subscribe(move |event: &FeedEvent<'_, T>| {
            let event = match event {
                FeedEvent::WorkingChanged(working) => RecordedEvent::Working(*working),
                FeedEvent::ItemAdded { index, item } => RecordedEvent::Added {
                    index: *index,
                    item: (*item).clone(),
                },
            };
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Recorded {
                    event,
                    thread: thread::current().id(),
                });
        });
        Self {
            log,
            _subscription: subscription,
        }
    }

    pub fn events(&self) -> Vec<RecordedEvent<T>> {
        self.with_log(|log| log.iter().map(|entry| entry.event.clone()).collect())
    }

    /// Items in the order their `ItemAdded` notifications arrived.
    pub fn items(&self) -> Vec<T> {
        self.with_log(|log| {
            log.iter()
                .filter_map(|entry| match &entry.event {
                    RecordedEvent::Added { item, .. } => Some(item.clone()),
                    RecordedEvent::Working(_) => None,
                })
                .collect()
        })
    }

    pub fn working_transitions(&self) -> Vec<bool> {
        self.with_log(|log| {
            log.iter()
                .filter_map(|entry| match entry.event {
                    RecordedEvent::Working(working) => Some(working),
                    RecordedEvent::Added { .. } => None,
                })
                .collect()
        })
    }

    /// Number of `Working(false)` notifications seen so far.
    pub fn completed_fetches(&self) -> usize {
        self.working_transitions()
            .into_iter()
            .filter(|working| !working)
            .count()
    }

    /// Whether every event so far was delivered on `thread`.
    pub fn all_delivered_on(&self, thread: ThreadId) -> bool {
        self.with_log(|log| log.iter().all(|entry| entry.thread == thread))
    }

    pub fn len(&self) -> usize {
        self.with_log(|log| log.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_log<R>(&self, f: impl FnOnce(&[Recorded<T>]) -> R) -> R {
        f(&self.log.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// [`ItemSource`] that accepts count requests and remembers them.
#[derive(Debug, Default)]
pub struct RecordingSource {
    requests: Mutex<Vec<usize>>,
}

impl RecordingSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every count forwarded to [`RequestCount::request`], oldest first.
    pub fn requests(&self) -> Vec<usize> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RequestCount for RecordingSource {
    fn request(&self, count: usize) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(count);
    }
}

impl ItemSource for RecordingSource {
    fn request_capability(&self) -> Option<&dyn RequestCount> {
        Some(self)
    }
}
