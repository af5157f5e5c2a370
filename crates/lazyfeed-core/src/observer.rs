//! Synchronous fan-out of feed notifications.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use smallvec::SmallVec;

/// Notification published on the designated execution context.
#[derive(Debug, PartialEq)]
pub enum FeedEvent<'a, T> {
    /// A fetch started (`true`) or finished (`false`).
    WorkingChanged(bool),
    /// `item` was appended at `index`.
    ItemAdded { index: usize, item: &'a T },
}

type Callback<T> = Arc<dyn Fn(&FeedEvent<'_, T>) + Send + Sync + 'static>;

pub(crate) struct ObserverList<T> {
    entries: Mutex<SmallVec<[(u64, Callback<T>); 2]>>,
    next_id: AtomicU64,
}

impl<T> ObserverList<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(SmallVec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn subscribe(
        self: &Arc<Self>,
        callback: impl Fn(&FeedEvent<'_, T>) + Send + Sync + 'static,
    ) -> Subscription
    where
        T: 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, Arc::new(callback)));
        let list: Weak<dyn Unsubscribe> = Arc::downgrade(self) as Weak<dyn Unsubscribe>;
        Subscription {
            list: Some(list),
            id,
        }
    }

    /// Delivers `event` to every observer in subscription order.
    pub(crate) fn notify(&self, event: &FeedEvent<'_, T>) {
        // Snapshot first so callbacks may subscribe or unsubscribe.
        let callbacks: SmallVec<[Callback<T>; 2]> = self
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SmallVec<[(u64, Callback<T>); 2]>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: u64);
}

impl<T> Unsubscribe for ObserverList<T> {
    fn unsubscribe(&self, id: u64) {
        self.lock().retain(|(entry, _)| *entry != id);
    }
}

/// Keeps an observer registered; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    list: Option<Weak<dyn Unsubscribe>>,
    id: u64,
}

impl Subscription {
    pub fn cancel(mut self) {
        self.unsubscribe();
    }

    fn unsubscribe(&mut self) {
        if let Some(list) = self.list.take().and_then(|list| list.upgrade()) {
            list.unsubscribe(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
