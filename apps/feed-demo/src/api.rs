//! Simulated paged backend.
//!
//! Each page is "downloaded" on its own thread after a fixed latency; the
//! cursor awaits the result and unwinds as soon as its token is cancelled.

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use futures_channel::oneshot;
use futures_util::future::{select, BoxFuture, Either};
use futures_util::FutureExt;
use lazyfeed_core::{CancelToken, ItemCursor, PagedSource, SourceError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    pub id: u64,
    pub title: String,
}

/// Paged timeline of `total_items` posts served `page_size` at a time.
#[derive(Clone, Debug)]
pub struct SimulatedApi {
    total_items: usize,
    page_size: usize,
    latency: Duration,
}

impl SimulatedApi {
    pub fn new(total_items: usize, page_size: usize, latency: Duration) -> Self {
        Self {
            total_items,
            page_size: page_size.max(1),
            latency,
        }
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    /// Loads page `page`; an empty page marks the end of the timeline.
    pub fn fetch_page(
        &self,
        page: usize,
        cancel: CancelToken,
    ) -> BoxFuture<'static, Result<Vec<Post>, SourceError>> {
        let start = page.saturating_mul(self.page_size).min(self.total_items);
        let end = start.saturating_add(self.page_size).min(self.total_items);
        let latency = self.latency;
        let (tx, rx) = oneshot::channel();

        thread::spawn(move || {
            thread::sleep(latency);
            let posts = (start..end)
                .map(|index| Post {
                    id: index as u64,
                    title: format!("Post #{index} (page {page})"),
                })
                .collect::<Vec<_>>();
            // The receiver is gone when the fetch was cancelled.
            let _ = tx.send(posts);
        });

        async move {
            match select(rx, cancel.cancelled()).await {
                Either::Left((Ok(posts), _)) => Ok(posts),
                Either::Left((Err(_), _)) => {
                    Err(SourceError::Failed(format!("page {page} loader vanished")))
                }
                Either::Right(((), _)) => Err(SourceError::Cancelled),
            }
        }
        .boxed()
    }
}

impl PagedSource<Post> for SimulatedApi {
    fn open(&self, cancel: CancelToken) -> Box<dyn ItemCursor<Post>> {
        Box::new(PageCursor {
            api: self.clone(),
            cancel,
            buffer: VecDeque::new(),
            next_page: 0,
            exhausted: false,
        })
    }
}

struct PageCursor {
    api: SimulatedApi,
    cancel: CancelToken,
    buffer: VecDeque<Post>,
    next_page: usize,
    exhausted: bool,
}

impl ItemCursor<Post> for PageCursor {
    fn advance(&mut self) -> BoxFuture<'_, Result<Option<Post>, SourceError>> {
        async move {
            if self.cancel.is_cancelled() {
                return Err(SourceError::Cancelled);
            }
            if self.buffer.is_empty() && !self.exhausted {
                let page = self.next_page;
                let posts = self.api.fetch_page(page, self.cancel.clone()).await?;
                log::debug!("page {page} delivered {} posts", posts.len());
                self.next_page += 1;
                self.exhausted = posts.len() < self.api.page_size;
                self.buffer.extend(posts);
            }
            Ok(self.buffer.pop_front())
        }
        .boxed()
    }

    fn release(&mut self) -> Result<(), SourceError> {
        self.buffer.clear();
        self.exhausted = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
