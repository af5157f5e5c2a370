use super::{StdRuntime, StdRuntimeOptions, StdScheduler};
use futures_executor::block_on;
use lazyfeed_core::RuntimeScheduler;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn posting_ui_work_requests_a_frame() {
    let runtime = StdRuntime::new().expect("runtime");
    assert!(!runtime.take_frame_request());

    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    runtime.runtime_handle().dispatcher().post(move || {
        flag.store(true, Ordering::SeqCst);
    });
    assert!(
        runtime.take_frame_request(),
        "posting to the UI queue should request a frame"
    );
    assert!(!runtime.take_frame_request(), "request is consumed");

    assert!(!ran.load(Ordering::SeqCst), "nothing runs before the drain");
    runtime.drain_ui();
    assert!(ran.load(Ordering::SeqCst));
    assert!(!runtime.runtime_handle().has_pending_ui());
}

#[test]
fn frame_waker_runs_on_schedule() {
    let scheduler = StdScheduler::new();
    let wakes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&wakes);
    scheduler.set_frame_waker(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    scheduler.schedule_frame();
    scheduler.schedule_frame();
    assert_eq!(wakes.load(Ordering::SeqCst), 2);

    scheduler.clear_frame_waker();
    scheduler.schedule_frame();
    assert_eq!(wakes.load(Ordering::SeqCst), 2);
}

#[test]
fn wait_for_frame_times_out_without_requests() {
    let scheduler = StdScheduler::new();
    assert!(!scheduler.wait_for_frame(Duration::from_millis(10)));
}

#[test]
fn wait_for_frame_wakes_on_request_from_another_thread() {
    let scheduler = Arc::new(StdScheduler::new());
    let remote = Arc::clone(&scheduler);
    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        remote.schedule_frame();
    });

    assert!(scheduler.wait_for_frame(Duration::from_secs(5)));
    worker.join().expect("worker thread");
}

#[test]
fn pump_until_runs_work_invoked_from_the_pool() {
    let runtime = StdRuntime::with_options(
        StdRuntimeOptions::default()
            .with_worker_threads(1)
            .with_thread_name_prefix("pump-test-"),
    )
    .expect("runtime");
    let context = runtime.dispatch_context();
    let applied = Arc::new(AtomicUsize::new(0));

    let dispatcher = context.dispatcher().clone();
    let counter = Arc::clone(&applied);
    thread::spawn(move || {
        for _ in 0..3 {
            let counter = Arc::clone(&counter);
            block_on(dispatcher.invoke(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .expect("runtime alive");
        }
    });

    let done = runtime.pump_until(Duration::from_secs(5), || {
        applied.load(Ordering::SeqCst) == 3
    });
    assert!(done, "all invoked tasks should have been applied");
}

#[test]
fn pump_until_reports_timeout() {
    let runtime = StdRuntime::new().expect("runtime");
    assert!(!runtime.pump_until(Duration::from_millis(20), || false));
}

#[test]
fn request_shutdown_stops_pumping() {
    let runtime = StdRuntime::new().expect("runtime");
    runtime.request_shutdown();
    assert!(!runtime.pump_until(Duration::from_secs(30), || false));
}

#[test]
fn worker_thread_count_is_at_least_one() {
    let options = StdRuntimeOptions::default().with_worker_threads(0);
    assert_eq!(options.worker_threads, 1);
}
