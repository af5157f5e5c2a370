//! Append-only item storage read from any thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

/// Growing, ordered sequence of delivered items.
///
/// Writes happen only on the designated execution context, one append at a
/// time. `len` is a lock-free read so background tasks can run the advisory
/// "already satisfied?" check without touching the lock.
pub struct ItemList<T> {
    items: RwLock<Vec<T>>,
    len: AtomicUsize,
}

impl<T> ItemList<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            len: AtomicUsize::new(0),
        }
    }

    /// Appends `item`, returning its index.
    pub(crate) fn push(&self, item: T) -> usize {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let index = items.len();
        items.push(item);
        self.len.store(items.len(), Ordering::SeqCst);
        index
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` against the current items.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        f(&items)
    }
}

impl<T: Clone> ItemList<T> {
    pub fn get(&self, index: usize) -> Option<T> {
        self.with_items(|items| items.get(index).cloned())
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.with_items(<[T]>::to_vec)
    }
}

impl<T> Default for ItemList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ItemList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemList").field("len", &self.len()).finish()
    }
}
