//! Cooperative cancellation shared between a collector and its producer.
//!
//! The collector owns the [`CancellationSource`]; producers receive a
//! [`CancelToken`] when their cursor is opened and either poll it between
//! steps or await [`CancelToken::cancelled`] next to their own suspension
//! points.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, Waker};

use crate::hash::map::HashMap;

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    next_waiter: AtomicU64,
    /// One entry per pending [`Cancelled`]; removed when that future drops.
    waiters: Mutex<HashMap<u64, Waker>>,
}

impl CancelState {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn register(&self, key: u64, waker: &Waker) {
        let mut waiters = self.waiters.lock().unwrap_or_else(PoisonError::into_inner);
        match waiters.get_mut(&key) {
            Some(current) if current.will_wake(waker) => {}
            Some(current) => *current = waker.clone(),
            None => {
                waiters.insert(key, waker.clone());
            }
        }
    }

    fn unregister(&self, key: u64) {
        self.waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
    }

    fn waiter_count(&self) -> usize {
        self.waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn cancel(&self) -> bool {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        let waiters = std::mem::take(
            &mut *self
                .waiters
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for (_, waker) in waiters {
            waker.wake();
        }
        true
    }
}

/// Owning side of a cancellation signal. Fires at most once.
#[derive(Default)]
pub struct CancellationSource {
    state: Arc<CancelState>,
}

impl CancellationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a token observing this source.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            state: Arc::clone(&self.state),
        }
    }

    /// Signals cancellation. Returns `false` if it was already signaled.
    pub fn cancel(&self) -> bool {
        self.state.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }
}

impl std::fmt::Debug for CancellationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationSource")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Cooperative cancellation token handed to producers.
///
/// The token flips to "cancelled" when the owning collector is disposed.
/// Blocking work is not interrupted automatically; callers should check
/// [`CancelToken::is_cancelled`] or race [`CancelToken::cancelled`].
#[derive(Clone)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        Self {
            state: Arc::default(),
        }
    }

    /// Returns `true` once the owning source has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// Returns whether the owning source is still active.
    pub fn is_active(&self) -> bool {
        !self.state.is_cancelled()
    }

    /// Future that completes once cancellation is signaled.
    pub fn cancelled(&self) -> Cancelled {
        Cancelled {
            state: Arc::clone(&self.state),
            key: self.state.next_waiter.fetch_add(1, Ordering::Relaxed),
            registered: false,
        }
    }

    /// Number of [`Cancelled`] futures currently parked on this token.
    pub fn waiter_count(&self) -> usize {
        self.state.waiter_count()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Future returned by [`CancelToken::cancelled`].
#[must_use = "futures do nothing unless polled"]
pub struct Cancelled {
    state: Arc<CancelState>,
    key: u64,
    registered: bool,
}

impl Future for Cancelled {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.state.is_cancelled() {
            return Poll::Ready(());
        }
        self.state.register(self.key, cx.waker());
        self.registered = true;
        // cancel() may have drained the waiters before we registered.
        if self.state.is_cancelled() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

impl Drop for Cancelled {
    fn drop(&mut self) {
        if self.registered {
            self.state.unregister(self.key);
        }
    }
}
