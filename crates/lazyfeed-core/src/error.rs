use std::fmt;

use crate::runtime::RuntimeDropped;
use crate::source::SourceError;

/// Why a fetch stopped before its demand was met.
///
/// Fetches are fire-and-forget, so these never reach callers of
/// [`request`](crate::RequestCount::request). `Cancelled` is the expected
/// teardown path and is filtered out before anything is logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Cancelled,
    RuntimeDropped,
    Source(SourceError),
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Cancelled => f.write_str("fetch cancelled"),
            FetchError::RuntimeDropped => f.write_str("designated runtime is gone"),
            FetchError::Source(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Source(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SourceError> for FetchError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Cancelled => FetchError::Cancelled,
            other => FetchError::Source(other),
        }
    }
}

impl From<RuntimeDropped> for FetchError {
    fn from(_: RuntimeDropped) -> Self {
        FetchError::RuntimeDropped
    }
}
