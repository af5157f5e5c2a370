use super::*;
use futures_executor::block_on;
use lazyfeed_core::CancellationSource;

fn quick_api(total_items: usize, page_size: usize) -> SimulatedApi {
    SimulatedApi::new(total_items, page_size, Duration::from_millis(1))
}

#[test]
fn cursor_walks_every_page_in_order() {
    let api = quick_api(5, 2);
    let mut cursor = api.open(CancelToken::never());

    let mut ids = Vec::new();
    while let Some(post) = block_on(cursor.advance()).expect("page load") {
        ids.push(post.id);
    }
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    assert_eq!(block_on(cursor.advance()), Ok(None));
}

#[test]
fn full_last_page_needs_one_empty_page_to_finish() {
    let api = quick_api(4, 2);
    assert_eq!(block_on(api.fetch_page(1, CancelToken::never())).map(|p| p.len()), Ok(2));
    assert_eq!(block_on(api.fetch_page(2, CancelToken::never())), Ok(Vec::new()));
}

#[test]
fn cancelled_cursor_stops_before_loading() {
    let cancel = CancellationSource::new();
    let api = quick_api(10, 4);
    let mut cursor = api.open(cancel.token());

    cancel.cancel();
    assert_eq!(block_on(cursor.advance()), Err(SourceError::Cancelled));
}

#[test]
fn cancellation_interrupts_a_slow_page() {
    let cancel = CancellationSource::new();
    let api = SimulatedApi::new(10, 4, Duration::from_secs(30));
    let token = cancel.token();

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        cancel.cancel();
    });
    assert_eq!(block_on(api.fetch_page(0, token)), Err(SourceError::Cancelled));
    canceller.join().expect("cancel thread");
}

#[test]
fn released_cursor_is_exhausted() {
    let api = quick_api(10, 4);
    let mut cursor = api.open(CancelToken::never());
    assert!(block_on(cursor.advance()).expect("first page").is_some());

    assert_eq!(cursor.release(), Ok(()));
    assert_eq!(block_on(cursor.advance()), Ok(None));
}
