//! Producer side of a feed: a lazily evaluated, cancelable item sequence.
//!
//! Paging logic (network calls, page tokens, retries) lives behind
//! [`PagedSource`]; the collector only ever asks for "the next item".

use std::fmt;

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, Stream, StreamExt};

use crate::cancel::CancelToken;

/// Failure reported by a producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The producer observed the cancel token and unwound.
    Cancelled,
    /// The cursor has no explicit release step.
    ReleaseUnsupported,
    /// Any other producer failure.
    Failed(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Cancelled => f.write_str("producer cancelled"),
            SourceError::ReleaseUnsupported => f.write_str("producer does not support release"),
            SourceError::Failed(reason) => write!(f, "producer failed: {reason}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Cursor over a producer's items. Owned by exactly one collector.
pub trait ItemCursor<T>: Send {
    /// Advances to the next item.
    ///
    /// `Ok(None)` means the producer is exhausted; calling again must keep
    /// returning `Ok(None)`. May suspend for an unbounded time.
    fn advance(&mut self) -> BoxFuture<'_, Result<Option<T>, SourceError>>;

    /// Releases resources held by the cursor.
    fn release(&mut self) -> Result<(), SourceError> {
        Err(SourceError::ReleaseUnsupported)
    }
}

/// Factory for cursors.
pub trait PagedSource<T> {
    /// Opens a cursor that observes `cancel`.
    fn open(&self, cancel: CancelToken) -> Box<dyn ItemCursor<T>>;
}

impl<T, S> PagedSource<T> for &S
where
    S: PagedSource<T> + ?Sized,
{
    fn open(&self, cancel: CancelToken) -> Box<dyn ItemCursor<T>> {
        (**self).open(cancel)
    }
}

/// Adapts a `futures` stream factory into a [`PagedSource`].
///
/// ```rust,ignore
/// let source = StreamSource::new(|_token: CancelToken| futures_util::stream::iter(0..100));
/// ```
pub struct StreamSource<F> {
    factory: F,
}

impl<F> StreamSource<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<T, S, F> PagedSource<T> for StreamSource<F>
where
    T: Send + 'static,
    S: Stream<Item = T> + Send + Unpin + 'static,
    F: Fn(CancelToken) -> S,
{
    fn open(&self, cancel: CancelToken) -> Box<dyn ItemCursor<T>> {
        let stream = (self.factory)(cancel.clone());
        Box::new(StreamCursor {
            stream: Some(stream),
            cancel,
        })
    }
}

struct StreamCursor<S> {
    stream: Option<S>,
    cancel: CancelToken,
}

impl<T, S> ItemCursor<T> for StreamCursor<S>
where
    T: Send + 'static,
    S: Stream<Item = T> + Send + Unpin + 'static,
{
    fn advance(&mut self) -> BoxFuture<'_, Result<Option<T>, SourceError>> {
        async move {
            if self.cancel.is_cancelled() {
                return Err(SourceError::Cancelled);
            }
            match self.stream.as_mut() {
                Some(stream) => Ok(stream.next().await),
                None => Ok(None),
            }
        }
        .boxed()
    }

    fn release(&mut self) -> Result<(), SourceError> {
        self.stream = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationSource;
    use futures_executor::block_on;
    use futures_util::stream;

    #[test]
    fn stream_cursor_yields_then_stays_exhausted() {
        let source = StreamSource::new(|_: CancelToken| stream::iter(vec![1, 2]));
        let mut cursor = source.open(CancelToken::never());

        assert_eq!(block_on(cursor.advance()), Ok(Some(1)));
        assert_eq!(block_on(cursor.advance()), Ok(Some(2)));
        assert_eq!(block_on(cursor.advance()), Ok(None));
        assert_eq!(block_on(cursor.advance()), Ok(None));
    }

    #[test]
    fn stream_cursor_observes_cancellation() {
        let cancel = CancellationSource::new();
        let source = StreamSource::new(|_: CancelToken| stream::iter(0..10));
        let mut cursor = source.open(cancel.token());

        assert_eq!(block_on(cursor.advance()), Ok(Some(0)));
        cancel.cancel();
        assert_eq!(block_on(cursor.advance()), Err(SourceError::Cancelled));
    }

    #[test]
    fn released_stream_cursor_reports_exhaustion() {
        let source = StreamSource::new(|_: CancelToken| stream::iter(0..10));
        let mut cursor = source.open(CancelToken::never());

        assert_eq!(cursor.release(), Ok(()));
        assert_eq!(block_on(cursor.advance()), Ok(None));
    }
}
