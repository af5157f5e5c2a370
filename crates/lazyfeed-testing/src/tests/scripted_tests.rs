use super::*;
use futures_executor::block_on;
use lazyfeed_core::CancellationSource;
use std::thread;
use std::time::Duration;

#[test]
fn yields_items_in_order_then_exhausts() {
    let source = ScriptedSource::new(vec!['a', 'b']);
    let mut cursor = source.open(CancelToken::never());

    assert_eq!(block_on(cursor.advance()), Ok(Some('a')));
    assert_eq!(block_on(cursor.advance()), Ok(Some('b')));
    assert_eq!(block_on(cursor.advance()), Ok(None));
    assert_eq!(source.advances(), 3);
    assert_eq!(source.max_concurrent_advances(), 1);
    assert_eq!(source.advances_in_flight(), 0);
}

#[test]
fn counts_release_attempts_and_dropped_cursors() {
    let source = ScriptedSource::new(0..3);
    let mut cursor = source.open(CancelToken::never());
    assert_eq!(source.cursors_opened(), 1);

    assert_eq!(cursor.release(), Ok(()));
    assert_eq!(block_on(cursor.advance()), Ok(None), "released cursor is exhausted");
    drop(cursor);

    assert_eq!(source.release_attempts(), 1);
    assert_eq!(source.cursors_dropped(), 1);
}

#[test]
fn without_release_reports_unsupported() {
    let source = ScriptedSource::new(0..3).without_release();
    let mut cursor = source.open(CancelToken::never());
    assert_eq!(cursor.release(), Err(SourceError::ReleaseUnsupported));
    assert_eq!(source.release_attempts(), 1);
}

#[test]
fn failing_at_reports_a_failure_for_that_index() {
    let source = ScriptedSource::new(0..3).failing_at(1);
    let mut cursor = source.open(CancelToken::never());
    assert_eq!(block_on(cursor.advance()), Ok(Some(0)));
    assert!(matches!(block_on(cursor.advance()), Err(SourceError::Failed(_))));
}

#[test]
fn gated_cursor_waits_for_permits() {
    let source = ScriptedSource::new(0..3).gated();
    let mut cursor = source.open(CancelToken::never());

    source.release_items(2);
    assert_eq!(block_on(cursor.advance()), Ok(Some(0)));
    assert_eq!(block_on(cursor.advance()), Ok(Some(1)));

    let release = {
        let feed = source.permits.clone().expect("gated source");
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            feed.grant(1);
        })
    };
    assert_eq!(block_on(cursor.advance()), Ok(Some(2)));
    release.join().expect("permit thread");
}

#[test]
fn gated_cursor_observes_cancellation_while_waiting() {
    let cancel = CancellationSource::new();
    let source = ScriptedSource::new(0..3).gated();
    let mut cursor = source.open(cancel.token());

    let signal = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        cancel.cancel();
    });
    assert_eq!(block_on(cursor.advance()), Err(SourceError::Cancelled));
    signal.join().expect("cancel thread");
    assert_eq!(source.cancelled_advances(), 1);
}
