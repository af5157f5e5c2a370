use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::task::{Context, Poll};
use std::thread::ThreadId;

use futures_channel::oneshot;

use crate::platform::{RuntimeScheduler, SharedSpawner};

type UiTask = Box<dyn FnOnce() + Send + 'static>;

struct UiDispatcherInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    tx: mpsc::Sender<UiTask>,
    pending: AtomicUsize,
    ui_thread_id: ThreadId,
}

impl UiDispatcherInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>, tx: mpsc::Sender<UiTask>) -> Self {
        Self {
            scheduler,
            tx,
            pending: AtomicUsize::new(0),
            ui_thread_id: std::thread::current().id(),
        }
    }

    fn post(&self, task: UiTask) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(task).is_err() {
            // Receiver is gone together with the runtime; the task is dropped.
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return;
        }
        self.scheduler.schedule_frame();
    }

    fn has_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }
}

struct PendingGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> PendingGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        Self { counter }
    }
}

impl<'a> Drop for PendingGuard<'a> {
    fn drop(&mut self) {
        let previous = self.counter.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "UI dispatcher pending count underflowed");
    }
}

/// Returned by [`UiDelivery`] when the runtime went away before the task ran.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RuntimeDropped;

impl fmt::Display for RuntimeDropped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("runtime dropped before the UI task ran")
    }
}

impl std::error::Error for RuntimeDropped {}

/// Thread-safe entry point into the designated execution context.
///
/// Cloning is cheap; every clone feeds the same UI queue.
#[derive(Clone)]
pub struct UiDispatcher {
    inner: Arc<UiDispatcherInner>,
}

impl UiDispatcher {
    fn new(inner: Arc<UiDispatcherInner>) -> Self {
        Self { inner }
    }

    /// Enqueues work from any thread to run on the UI thread.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        self.inner.post(Box::new(task));
    }

    /// Enqueues `task` and returns a future that completes once it has run.
    ///
    /// Background work awaits the returned [`UiDelivery`] to stay in lockstep
    /// with the UI thread: nothing after the await can overtake the task.
    pub fn invoke(&self, task: impl FnOnce() + Send + 'static) -> UiDelivery {
        let (done_tx, done_rx) = oneshot::channel();
        self.inner.post(Box::new(move || {
            task();
            let _ = done_tx.send(());
        }));
        UiDelivery { done: done_rx }
    }

    pub fn has_pending(&self) -> bool {
        self.inner.has_pending()
    }

    /// Debug-asserts that the caller is on the thread that drains this queue.
    pub fn assert_ui_thread(&self) {
        debug_assert_eq!(
            std::thread::current().id(),
            self.inner.ui_thread_id,
            "feed mutated off the runtime's UI thread"
        );
    }
}

impl fmt::Debug for UiDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiDispatcher")
            .field("pending", &self.inner.pending.load(Ordering::SeqCst))
            .finish()
    }
}

/// Completion of a task handed to [`UiDispatcher::invoke`].
#[must_use = "UiDelivery does nothing unless awaited"]
pub struct UiDelivery {
    done: oneshot::Receiver<()>,
}

impl Future for UiDelivery {
    type Output = Result<(), RuntimeDropped>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.done)
            .poll(cx)
            .map(|result| result.map_err(|_| RuntimeDropped))
    }
}

struct RuntimeInner {
    ui_dispatcher: Arc<UiDispatcherInner>,
    ui_rx: RefCell<mpsc::Receiver<UiTask>>,
    ui_thread_id: ThreadId,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        let (tx, rx) = mpsc::channel();
        let dispatcher = Arc::new(UiDispatcherInner::new(scheduler, tx));
        Self {
            ui_dispatcher: dispatcher,
            ui_rx: RefCell::new(rx),
            ui_thread_id: std::thread::current().id(),
        }
    }

    fn drain_ui(&self) {
        debug_assert_eq!(
            std::thread::current().id(),
            self.ui_thread_id,
            "UI queue drained off the runtime thread",
        );
        loop {
            // Pull one task at a time so tasks posted while draining (and
            // nested drains from inside a task) see a consistent queue.
            let next = self.ui_rx.borrow_mut().try_recv();
            let Ok(task) = next else {
                break;
            };
            let _guard = PendingGuard::new(&self.ui_dispatcher.pending);
            task();
        }
    }

    fn has_pending_ui(&self) -> bool {
        self.ui_dispatcher.has_pending()
    }
}

/// The designated execution context.
///
/// Created on the thread that will drain it (typically the UI thread); all
/// item appends and notifications posted through its [`UiDispatcher`] run on
/// that thread, in posting order.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            inner: Rc::downgrade(&self.inner),
            dispatcher: UiDispatcher::new(self.inner.ui_dispatcher.clone()),
        }
    }

    pub fn dispatcher(&self) -> UiDispatcher {
        UiDispatcher::new(self.inner.ui_dispatcher.clone())
    }
}

#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_frame(&self) {}
}

/// UI-thread view of a [`Runtime`]. Does not keep the runtime alive.
#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Weak<RuntimeInner>,
    dispatcher: UiDispatcher,
}

impl RuntimeHandle {
    /// Runs every queued UI task, including ones queued while draining.
    pub fn drain_ui(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.drain_ui();
        }
    }

    pub fn has_pending_ui(&self) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.has_pending_ui())
            .unwrap_or_else(|| self.dispatcher.has_pending())
    }

    pub fn is_alive(&self) -> bool {
        self.inner.upgrade().is_some()
    }

    pub fn dispatcher(&self) -> UiDispatcher {
        self.dispatcher.clone()
    }

    /// Pairs this runtime's dispatcher with a background spawner.
    pub fn dispatch_context(&self, spawner: SharedSpawner) -> DispatchContext {
        DispatchContext::new(self.dispatcher(), spawner)
    }
}

/// Everything a collector needs to fetch off-thread and publish on the UI thread.
#[derive(Clone)]
pub struct DispatchContext {
    dispatcher: UiDispatcher,
    spawner: SharedSpawner,
}

impl DispatchContext {
    pub fn new(dispatcher: UiDispatcher, spawner: SharedSpawner) -> Self {
        Self {
            dispatcher,
            spawner,
        }
    }

    pub fn dispatcher(&self) -> &UiDispatcher {
        &self.dispatcher
    }

    pub fn spawner(&self) -> &SharedSpawner {
        &self.spawner
    }
}

impl fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
