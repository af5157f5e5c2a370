//! Capabilities exposed to list widgets.

/// Accepts "grow to at least `count` items" requests.
///
/// Fire-and-forget: implementations return immediately and report progress
/// through their own notifications.
pub trait RequestCount {
    fn request(&self, count: usize);
}

/// Anything a list widget can display.
///
/// Sources that can load more on demand expose [`RequestCount`]; the rest
/// keep the default and are ignored by demand tracking.
pub trait ItemSource {
    fn request_capability(&self) -> Option<&dyn RequestCount> {
        None
    }
}

impl<T> ItemSource for Vec<T> {}
