//! Scripted producer with counters for asserting collector behavior.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures_util::future::{select, BoxFuture, Either};
use futures_util::{FutureExt, StreamExt};
use lazyfeed_core::{CancelToken, ItemCursor, PagedSource, SourceError};

#[derive(Default)]
struct SourceStats {
    advances: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    cancelled_advances: AtomicUsize,
    release_attempts: AtomicUsize,
    cursors_opened: AtomicUsize,
    cursors_dropped: AtomicUsize,
}

/// Marks one advance as in progress for the lifetime of the guard.
struct InFlight {
    stats: Arc<SourceStats>,
}

impl InFlight {
    fn enter(stats: Arc<SourceStats>) -> Self {
        let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self { stats }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Senders feeding permits to every gated cursor opened so far.
#[derive(Default)]
struct PermitFeed {
    senders: Mutex<Vec<UnboundedSender<()>>>,
}

impl PermitFeed {
    fn open(&self) -> UnboundedReceiver<()> {
        let (tx, rx) = mpsc::unbounded();
        self.lock().push(tx);
        rx
    }

    fn grant(&self, permits: usize) {
        self.lock().retain(|tx| {
            (0..permits).all(|_| tx.unbounded_send(()).is_ok())
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<UnboundedSender<()>>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A [`PagedSource`] that yields a fixed list of items and counts every
/// interaction with it.
///
/// In gated mode each advance waits for a permit handed out through
/// [`release_items`](Self::release_items), which lets tests hold a fetch
/// in the middle of its pull loop.
pub struct ScriptedSource<T> {
    items: Arc<[T]>,
    stats: Arc<SourceStats>,
    release_supported: bool,
    fail_at: Option<usize>,
    permits: Option<Arc<PermitFeed>>,
    last_token: Mutex<Option<CancelToken>>,
}

impl<T> ScriptedSource<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: items.into_iter().collect(),
            stats: Arc::new(SourceStats::default()),
            release_supported: true,
            fail_at: None,
            permits: None,
            last_token: Mutex::new(None),
        }
    }

    /// Every advance waits for a permit from [`release_items`](Self::release_items).
    pub fn gated(mut self) -> Self {
        self.permits = Some(Arc::new(PermitFeed::default()));
        self
    }

    /// Cursors report [`SourceError::ReleaseUnsupported`] on release.
    pub fn without_release(mut self) -> Self {
        self.release_supported = false;
        self
    }

    /// The advance that would yield `index` fails instead.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Lets gated cursors complete `count` more advances.
    pub fn release_items(&self, count: usize) {
        match &self.permits {
            Some(feed) => feed.grant(count),
            None => log::debug!("release_items({count}) on an ungated source"),
        }
    }

    pub fn advances(&self) -> usize {
        self.stats.advances.load(Ordering::SeqCst)
    }

    pub fn advances_in_flight(&self) -> usize {
        self.stats.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of advances that were ever in progress at once.
    pub fn max_concurrent_advances(&self) -> usize {
        self.stats.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn cancelled_advances(&self) -> usize {
        self.stats.cancelled_advances.load(Ordering::SeqCst)
    }

    pub fn release_attempts(&self) -> usize {
        self.stats.release_attempts.load(Ordering::SeqCst)
    }

    pub fn cursors_opened(&self) -> usize {
        self.stats.cursors_opened.load(Ordering::SeqCst)
    }

    pub fn cursors_dropped(&self) -> usize {
        self.stats.cursors_dropped.load(Ordering::SeqCst)
    }

    /// Cancellation waiters still parked on the most recently opened cursor's token.
    pub fn parked_cancel_waiters(&self) -> usize {
        self.last_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, CancelToken::waiter_count)
    }
}

impl<T> PagedSource<T> for ScriptedSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn open(&self, cancel: CancelToken) -> Box<dyn ItemCursor<T>> {
        self.stats.cursors_opened.fetch_add(1, Ordering::SeqCst);
        *self
            .last_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(cancel.clone());
        Box::new(ScriptedCursor {
            items: Arc::clone(&self.items),
            next: 0,
            stats: Arc::clone(&self.stats),
            release_supported: self.release_supported,
            fail_at: self.fail_at,
            permits: self.permits.as_ref().map(|feed| feed.open()),
            cancel,
        })
    }
}

struct ScriptedCursor<T> {
    items: Arc<[T]>,
    next: usize,
    stats: Arc<SourceStats>,
    release_supported: bool,
    fail_at: Option<usize>,
    permits: Option<UnboundedReceiver<()>>,
    cancel: CancelToken,
}

impl<T> ScriptedCursor<T> {
    fn cancelled(&self) -> Result<Option<T>, SourceError> {
        self.stats.cancelled_advances.fetch_add(1, Ordering::SeqCst);
        Err(SourceError::Cancelled)
    }
}

impl<T> ItemCursor<T> for ScriptedCursor<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn advance(&mut self) -> BoxFuture<'_, Result<Option<T>, SourceError>> {
        async move {
            let _in_flight = InFlight::enter(Arc::clone(&self.stats));
            self.stats.advances.fetch_add(1, Ordering::SeqCst);
            if self.cancel.is_cancelled() {
                return self.cancelled();
            }
            if self.next >= self.items.len() {
                return Ok(None);
            }

            let cancel = self.cancel.clone();
            // None: cancelled while waiting. Some(false): permit feed closed.
            let permitted = match self.permits.as_mut() {
                Some(permits) => match select(permits.next(), cancel.cancelled()).await {
                    Either::Left((permit, _)) => Some(permit.is_some()),
                    Either::Right(_) => None,
                },
                None => Some(true),
            };
            match permitted {
                None => return self.cancelled(),
                Some(false) => return Ok(None),
                Some(true) => {}
            }

            let index = self.next;
            if self.fail_at == Some(index) {
                return Err(SourceError::Failed(format!("scripted failure at {index}")));
            }
            self.next += 1;
            Ok(Some(self.items[index].clone()))
        }
        .boxed()
    }

    fn release(&mut self) -> Result<(), SourceError> {
        self.stats.release_attempts.fetch_add(1, Ordering::SeqCst);
        if !self.release_supported {
            return Err(SourceError::ReleaseUnsupported);
        }
        self.next = self.items.len();
        self.permits = None;
        Ok(())
    }
}

impl<T> Drop for ScriptedCursor<T> {
    fn drop(&mut self) {
        self.stats.cursors_dropped.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "tests/scripted_tests.rs"]
mod tests;
