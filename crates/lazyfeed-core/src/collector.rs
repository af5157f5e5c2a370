//! Demand-driven collector: pulls from a producer only as far as requested.
//!
//! Callers say "I need at least N items"; the collector decides whether a
//! fetch is needed, runs at most one at a time, and publishes every append
//! and every working transition on the designated execution context.
//!
//! # Coalescing
//!
//! [`PagingCollector::request`] checks the current length without locking
//! and, if more items may be needed, spawns a fetch task. The task enters the
//! [`AdmissionGate`] and checks again; a task that queued behind another fetch
//! usually finds its demand already met and exits without touching the
//! producer. Both checks are intentional: the first keeps satisfied requests
//! off the worker pool, the second collapses concurrent requests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::{select, Either};
use futures_util::task::SpawnExt;

use crate::cancel::CancellationSource;
use crate::capability::{ItemSource, RequestCount};
use crate::error::FetchError;
use crate::gate::AdmissionGate;
use crate::items::ItemList;
use crate::observer::{FeedEvent, ObserverList, Subscription};
use crate::runtime::{DispatchContext, RuntimeDropped};
use crate::source::{ItemCursor, PagedSource, SourceError};

type CursorSlot<T> = Option<Box<dyn ItemCursor<T>>>;

struct CollectorShared<T> {
    items: ItemList<T>,
    observers: Arc<ObserverList<T>>,
    gate: AdmissionGate<CursorSlot<T>>,
    cancel: CancellationSource,
    disposed: AtomicBool,
    context: DispatchContext,
}

/// Growing view over a lazily produced sequence.
///
/// Owns exactly one producer cursor. Dropping the collector disposes it, so
/// replacing a collector with a new instance tears the old one down.
pub struct PagingCollector<T: Send + Sync + 'static> {
    shared: Arc<CollectorShared<T>>,
}

impl<T: Send + Sync + 'static> PagingCollector<T> {
    /// Opens a cursor on `source` bound to this collector's cancel token.
    pub fn new<S>(source: &S, context: DispatchContext) -> Self
    where
        S: PagedSource<T> + ?Sized,
    {
        let cancel = CancellationSource::new();
        let cursor = source.open(cancel.token());
        Self {
            shared: Arc::new(CollectorShared {
                items: ItemList::new(),
                observers: Arc::new(ObserverList::new()),
                gate: AdmissionGate::new(Some(cursor)),
                cancel,
                disposed: AtomicBool::new(false),
                context,
            }),
        }
    }

    /// Requests that the sequence grow to at least `count` items.
    ///
    /// Returns immediately. Progress is observable only through
    /// [`subscribe`](Self::subscribe) and the read accessors.
    pub fn request(&self, count: usize) {
        let shared = &self.shared;
        if shared.disposed.load(Ordering::SeqCst) {
            log::trace!("request({count}) ignored: collector disposed");
            return;
        }
        if shared.items.len() > count {
            return;
        }

        let task_shared = Arc::clone(shared);
        let fetch = async move {
            match task_shared.fetch(count).await {
                Ok(()) => {}
                Err(err) if err.is_cancelled() => {}
                Err(err) => log::warn!("fetch towards {count} items stopped: {err}"),
            }
        };
        if let Err(err) = shared.context.spawner().spawn(fetch) {
            log::warn!("could not spawn fetch towards {count} items: {err}");
        }
    }

    /// Cancels the producer and releases its cursor. Idempotent.
    ///
    /// Never blocks: if a fetch currently holds the gate, the release runs
    /// on the worker pool once that fetch has observed the cancellation.
    pub fn dispose(&self) {
        let shared = &self.shared;
        if shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if !shared.cancel.cancel() {
            log::trace!("collector cancellation was already signaled");
        }

        if let Some(mut pass) = shared.gate.try_enter() {
            release_cursor(&mut *pass);
            return;
        }
        let deferred = Arc::clone(shared);
        let release = async move {
            let mut pass = deferred.gate.enter().await;
            release_cursor(&mut *pass);
        };
        if let Err(err) = shared.context.spawner().spawn(release) {
            log::warn!("could not defer cursor release: {err}");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }

    /// Registers `observer` for working and item-added notifications.
    ///
    /// Observers always run on the designated execution context.
    pub fn subscribe(
        &self,
        observer: impl Fn(&FeedEvent<'_, T>) + Send + Sync + 'static,
    ) -> Subscription {
        self.shared.observers.subscribe(observer)
    }

    pub fn items(&self) -> &ItemList<T> {
        &self.shared.items
    }

    pub fn len(&self) -> usize {
        self.shared.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.items.is_empty()
    }

    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.shared.items.with_items(f)
    }
}

impl<T: Clone + Send + Sync + 'static> PagingCollector<T> {
    pub fn get(&self, index: usize) -> Option<T> {
        self.shared.items.get(index)
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.shared.items.snapshot()
    }
}

impl<T: Send + Sync + 'static> CollectorShared<T> {
    async fn fetch(self: &Arc<Self>, count: usize) -> Result<(), FetchError> {
        let mut pass = self.gate.enter().await;
        if self.items.len() > count {
            log::trace!("fetch towards {count} items already satisfied");
            return Ok(());
        }
        if self.cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let Some(cursor) = pass.as_mut() else {
            return Err(FetchError::Cancelled);
        };

        log::debug!("fetching towards {count} items from {}", self.items.len());
        self.publish_working(true).await?;
        let pulled = self.pull_until(&mut **cursor, count).await;
        let finished = self.publish_working(false).await;
        drop(pass);

        pulled.and(finished.map_err(FetchError::from))
    }

    async fn pull_until(
        self: &Arc<Self>,
        cursor: &mut dyn ItemCursor<T>,
        count: usize,
    ) -> Result<(), FetchError> {
        let token = self.cancel.token();
        while self.items.len() < count {
            if token.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            let next = match select(cursor.advance(), token.cancelled()).await {
                Either::Left((next, _)) => next?,
                Either::Right(((), _)) => return Err(FetchError::Cancelled),
            };
            let Some(item) = next else {
                log::debug!("producer exhausted at {} items", self.items.len());
                return Ok(());
            };

            let shared = Arc::clone(self);
            self.context
                .dispatcher()
                .invoke(move || shared.append(item))
                .await?;
        }
        Ok(())
    }

    async fn publish_working(self: &Arc<Self>, working: bool) -> Result<(), RuntimeDropped> {
        let shared = Arc::clone(self);
        self.context
            .dispatcher()
            .invoke(move || {
                shared
                    .observers
                    .notify(&FeedEvent::WorkingChanged(working))
            })
            .await
    }

    /// Runs on the designated execution context.
    fn append(&self, item: T) {
        self.context.dispatcher().assert_ui_thread();
        let index = self.items.push(item);
        self.items.with_items(|items| {
            self.observers.notify(&FeedEvent::ItemAdded {
                index,
                item: &items[index],
            })
        });
    }
}

fn release_cursor<T>(slot: &mut CursorSlot<T>) {
    let Some(mut cursor) = slot.take() else {
        return;
    };
    match cursor.release() {
        Ok(()) => log::trace!("producer cursor released"),
        Err(SourceError::ReleaseUnsupported) => {}
        Err(err) => log::warn!("producer cursor release failed: {err}"),
    }
}

impl<T: Send + Sync + 'static> RequestCount for PagingCollector<T> {
    fn request(&self, count: usize) {
        PagingCollector::request(self, count);
    }
}

impl<T: Send + Sync + 'static> ItemSource for PagingCollector<T> {
    fn request_capability(&self) -> Option<&dyn RequestCount> {
        Some(self)
    }
}

impl<T: Send + Sync + 'static> Drop for PagingCollector<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for PagingCollector<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagingCollector")
            .field("len", &self.len())
            .field("observers", &self.shared.observers.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
