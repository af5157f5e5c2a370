use super::*;
use crate::{EventRecorder, RecordedEvent, ScriptedSource};
use std::thread;

#[test]
fn feed_test_rule_delivers_on_the_test_thread() {
    run_feed_test(|rule| {
        let source = ScriptedSource::new(vec![10, 20, 30]);
        let collector = rule.collector(&source);
        let recorder = EventRecorder::attach(&collector);

        collector.request(3);
        rule.pump_until("three items", || collector.len() == 3);
        rule.pump_until("fetch to finish", || recorder.completed_fetches() == 1);

        assert_eq!(collector.snapshot(), vec![10, 20, 30]);
        assert_eq!(
            recorder.events(),
            vec![
                RecordedEvent::Working(true),
                RecordedEvent::Added { index: 0, item: 10 },
                RecordedEvent::Added { index: 1, item: 20 },
                RecordedEvent::Added { index: 2, item: 30 },
                RecordedEvent::Working(false),
            ]
        );
        assert!(recorder.all_delivered_on(thread::current().id()));
    });
}

#[test]
#[should_panic(expected = "pump_until timed out")]
fn pump_until_panics_on_timeout() {
    let rule = FeedTestRule::new().with_timeout(Duration::from_millis(20));
    rule.pump_until("never", || false);
}
