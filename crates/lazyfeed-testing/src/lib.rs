//! Testing utilities and harness for lazyfeed.

pub mod recorder;
pub mod scripted;
pub mod testing;

pub use recorder::{EventRecorder, RecordedEvent, RecordingSource};
pub use scripted::ScriptedSource;
pub use testing::{run_feed_test, FeedTestRule};
