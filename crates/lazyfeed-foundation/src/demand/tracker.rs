use std::hash::Hash;
use std::ops::Range;
use std::sync::{Arc, Weak};

use lazyfeed_core::hash::map::HashMap;
use lazyfeed_core::{hash_key, ItemSource};
use smallvec::SmallVec;

use super::DemandStrategy;

/// Stable identity of a list widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListId(u64);

impl ListId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Derives an id from any hashable key, such as a widget path.
    pub fn from_key<K: Hash + ?Sized>(key: &K) -> Self {
        Self(hash_key(key))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Lifecycle and visibility signals from a list widget.
#[derive(Clone, Debug)]
pub enum ListEvent {
    Attached {
        list: ListId,
        source: Option<Weak<dyn ItemSource>>,
    },
    SourceChanged {
        list: ListId,
        source: Option<Weak<dyn ItemSource>>,
    },
    ItemVisible {
        list: ListId,
        position: usize,
    },
    RangeVisible {
        list: ListId,
        range: Range<usize>,
    },
    Detached {
        list: ListId,
    },
}

impl ListEvent {
    pub fn attached<S: ItemSource + 'static>(list: ListId, source: &Arc<S>) -> Self {
        ListEvent::Attached {
            list,
            source: Some(downgrade(source)),
        }
    }

    pub fn source_changed<S: ItemSource + 'static>(list: ListId, source: &Arc<S>) -> Self {
        ListEvent::SourceChanged {
            list,
            source: Some(downgrade(source)),
        }
    }

    pub fn list(&self) -> ListId {
        match self {
            ListEvent::Attached { list, .. }
            | ListEvent::SourceChanged { list, .. }
            | ListEvent::ItemVisible { list, .. }
            | ListEvent::RangeVisible { list, .. }
            | ListEvent::Detached { list } => *list,
        }
    }
}

fn downgrade<S: ItemSource + 'static>(source: &Arc<S>) -> Weak<dyn ItemSource> {
    let weak: Weak<dyn ItemSource> = Arc::<S>::downgrade(source);
    weak
}

struct TrackedList {
    source: Option<Weak<dyn ItemSource>>,
    last_requested: usize,
}

/// Forwards list visibility to item sources as monotonic count requests.
///
/// Each attached list keeps a baseline: the last demand forwarded to its
/// source. A demand is forwarded only when it exceeds the baseline, and only
/// to sources that expose [`RequestCount`](lazyfeed_core::RequestCount).
/// Attaching or assigning a source resets the baseline to zero and forwards
/// the initial demand.
///
/// Sources are held weakly. Lists must be [`detach`](Self::detach)ed
/// explicitly; nothing is cleaned up behind the caller's back.
pub struct DemandTracker {
    strategy: DemandStrategy,
    lists: HashMap<ListId, TrackedList>,
}

impl DemandTracker {
    pub fn new(strategy: DemandStrategy) -> Self {
        Self {
            strategy,
            lists: HashMap::default(),
        }
    }

    pub fn strategy(&self) -> DemandStrategy {
        self.strategy
    }

    /// Starts tracking `list` with `source` and forwards the initial demand.
    pub fn attach<S: ItemSource + 'static>(&mut self, list: ListId, source: &Arc<S>) {
        self.attach_weak(list, Some(downgrade(source)));
    }

    /// Replaces the source of an attached list.
    ///
    /// Resets the baseline, then forwards the initial demand to the new
    /// source. Ignored for lists that are not attached.
    pub fn assign_source<S: ItemSource + 'static>(&mut self, list: ListId, source: &Arc<S>) {
        self.assign_weak(list, Some(downgrade(source)));
    }

    /// Removes the source of an attached list and resets its baseline.
    pub fn clear_source(&mut self, list: ListId) {
        self.assign_weak(list, None);
    }

    /// Reports that the item at `position` became visible.
    ///
    /// Returns the demand forwarded to the source, if any.
    pub fn item_visible(&mut self, list: ListId, position: usize) -> Option<usize> {
        let demand = self.strategy.demand_for_position(position);
        let Some(entry) = self.lists.get_mut(&list) else {
            log::trace!("visibility for unattached list {list:?} ignored");
            return None;
        };
        apply_demand(list, entry, demand)
    }

    /// Reports a visible window; demand follows its last position.
    pub fn range_visible(&mut self, list: ListId, range: Range<usize>) -> Option<usize> {
        if range.is_empty() {
            return None;
        }
        self.item_visible(list, range.end - 1)
    }

    /// Stops tracking `list`. Returns whether it was attached.
    pub fn detach(&mut self, list: ListId) -> bool {
        self.lists.remove(&list).is_some()
    }

    /// Last demand forwarded for `list`, or `None` if it is not attached.
    pub fn last_requested(&self, list: ListId) -> Option<usize> {
        self.lists.get(&list).map(|entry| entry.last_requested)
    }

    pub fn is_attached(&self, list: ListId) -> bool {
        self.lists.contains_key(&list)
    }

    /// Ids of every attached list, in ascending order.
    pub fn tracked_lists(&self) -> SmallVec<[ListId; 4]> {
        let mut ids: SmallVec<[ListId; 4]> = self.lists.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Applies a widget event. Returns the demand forwarded, if any.
    pub fn handle(&mut self, event: ListEvent) -> Option<usize> {
        match event {
            ListEvent::Attached { list, source } => self.attach_weak(list, source),
            ListEvent::SourceChanged { list, source } => self.assign_weak(list, source),
            ListEvent::ItemVisible { list, position } => self.item_visible(list, position),
            ListEvent::RangeVisible { list, range } => self.range_visible(list, range),
            ListEvent::Detached { list } => {
                self.detach(list);
                None
            }
        }
    }

    fn attach_weak(&mut self, list: ListId, source: Option<Weak<dyn ItemSource>>) -> Option<usize> {
        let entry = self.lists.entry(list).or_insert(TrackedList {
            source: None,
            last_requested: 0,
        });
        reset(list, entry, source, self.strategy.initial_demand)
    }

    fn assign_weak(&mut self, list: ListId, source: Option<Weak<dyn ItemSource>>) -> Option<usize> {
        let Some(entry) = self.lists.get_mut(&list) else {
            log::trace!("source change for unattached list {list:?} ignored");
            return None;
        };
        reset(list, entry, source, self.strategy.initial_demand)
    }
}

impl Default for DemandTracker {
    fn default() -> Self {
        Self::new(DemandStrategy::default())
    }
}

impl std::fmt::Debug for DemandTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemandTracker")
            .field("strategy", &self.strategy)
            .field("lists", &self.tracked_lists())
            .finish()
    }
}

fn reset(
    list: ListId,
    entry: &mut TrackedList,
    source: Option<Weak<dyn ItemSource>>,
    initial_demand: usize,
) -> Option<usize> {
    entry.source = source;
    entry.last_requested = 0;
    apply_demand(list, entry, initial_demand)
}

fn apply_demand(list: ListId, entry: &mut TrackedList, demand: usize) -> Option<usize> {
    let source = entry.source.as_ref()?.upgrade()?;
    let requester = source.request_capability()?;
    if demand <= entry.last_requested {
        return None;
    }
    entry.last_requested = demand;
    log::trace!("list {list:?} requesting {demand} items");
    requester.request(demand);
    Some(demand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyfeed_core::RequestCount;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Counting {
        requests: Mutex<Vec<usize>>,
    }

    impl Counting {
        fn requests(&self) -> Vec<usize> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl RequestCount for Counting {
        fn request(&self, count: usize) {
            self.requests.lock().unwrap().push(count);
        }
    }

    impl ItemSource for Counting {
        fn request_capability(&self) -> Option<&dyn RequestCount> {
            Some(self)
        }
    }

    #[test]
    fn visibility_demand_only_grows() {
        let source = Arc::new(Counting::default());
        let list = ListId::new(1);
        let mut tracker = DemandTracker::default();

        tracker.attach(list, &source);
        for position in [3, 7, 5, 10] {
            tracker.item_visible(list, position);
        }

        assert_eq!(source.requests(), vec![10, 12, 15]);
        assert_eq!(tracker.last_requested(list), Some(15));
    }

    #[test]
    fn reassigning_resets_the_baseline() {
        let first = Arc::new(Counting::default());
        let second = Arc::new(Counting::default());
        let list = ListId::new(1);
        let mut tracker = DemandTracker::default();

        tracker.attach(list, &first);
        tracker.item_visible(list, 40);
        assert_eq!(tracker.last_requested(list), Some(45));

        tracker.assign_source(list, &second);
        assert_eq!(second.requests(), vec![10]);
        assert_eq!(tracker.last_requested(list), Some(10));

        tracker.item_visible(list, 6);
        assert_eq!(second.requests(), vec![10, 11]);
        assert_eq!(first.requests(), vec![10, 45]);
    }

    #[test]
    fn reassigning_the_same_source_sends_initial_demand_again() {
        let source = Arc::new(Counting::default());
        let list = ListId::new(9);
        let mut tracker = DemandTracker::default();

        tracker.attach(list, &source);
        tracker.item_visible(list, 20);
        tracker.assign_source(list, &source);

        assert_eq!(source.requests(), vec![10, 25, 10]);
    }

    #[test]
    fn clearing_the_source_resets_and_silences_the_list() {
        let source = Arc::new(Counting::default());
        let list = ListId::new(4);
        let mut tracker = DemandTracker::default();

        tracker.attach(list, &source);
        tracker.item_visible(list, 12);
        assert_eq!(tracker.last_requested(list), Some(17));

        tracker.clear_source(list);
        assert!(tracker.is_attached(list));
        assert_eq!(tracker.last_requested(list), Some(0));

        assert_eq!(tracker.item_visible(list, 30), None);
        assert_eq!(tracker.range_visible(list, 0..50), None);
        assert_eq!(source.requests(), vec![10, 17]);

        tracker.assign_source(list, &source);
        assert_eq!(source.requests(), vec![10, 17, 10]);
    }

    #[test]
    fn sources_without_the_capability_are_ignored() {
        let plain = Arc::new(vec![1, 2, 3]);
        let list = ListId::new(2);
        let mut tracker = DemandTracker::default();

        tracker.attach(list, &plain);
        assert_eq!(tracker.item_visible(list, 30), None);
        assert_eq!(tracker.last_requested(list), Some(0));
    }

    #[test]
    fn dropped_sources_are_ignored() {
        let source = Arc::new(Counting::default());
        let list = ListId::new(3);
        let mut tracker = DemandTracker::default();

        tracker.attach(list, &source);
        drop(source);

        assert_eq!(tracker.item_visible(list, 30), None);
        assert_eq!(tracker.last_requested(list), Some(10));
    }

    #[test]
    fn events_for_unattached_lists_are_ignored() {
        let source = Arc::new(Counting::default());
        let mut tracker = DemandTracker::default();
        let list = ListId::new(4);

        assert_eq!(tracker.item_visible(list, 3), None);
        tracker.assign_source(list, &source);

        assert!(source.requests().is_empty());
        assert!(!tracker.is_attached(list));
    }

    #[test]
    fn detached_lists_start_over_when_attached_again() {
        let source = Arc::new(Counting::default());
        let list = ListId::from_key("feed/home");
        let mut tracker = DemandTracker::default();

        tracker.attach(list, &source);
        tracker.item_visible(list, 50);
        assert!(tracker.detach(list));
        assert!(!tracker.detach(list));
        assert_eq!(tracker.last_requested(list), None);
        assert_eq!(tracker.item_visible(list, 60), None);

        tracker.attach(list, &source);
        assert_eq!(source.requests(), vec![10, 55, 10]);
    }

    #[test]
    fn range_visibility_uses_the_last_position() {
        let source = Arc::new(Counting::default());
        let list = ListId::new(5);
        let mut tracker = DemandTracker::new(DemandStrategy::new(4, 2));

        tracker.attach(list, &source);
        assert_eq!(tracker.range_visible(list, 0..8), Some(9));
        assert_eq!(tracker.range_visible(list, 3..3), None);

        assert_eq!(source.requests(), vec![4, 9]);
    }

    #[test]
    fn handle_routes_events() {
        let source = Arc::new(Counting::default());
        let list = ListId::new(6);
        let mut tracker = DemandTracker::default();

        assert_eq!(tracker.handle(ListEvent::attached(list, &source)), Some(10));
        assert_eq!(
            tracker.handle(ListEvent::ItemVisible { list, position: 8 }),
            Some(13)
        );
        assert_eq!(
            tracker.handle(ListEvent::RangeVisible { list, range: 2..6 }),
            None
        );
        assert_eq!(tracker.handle(ListEvent::Detached { list }), None);
        assert!(tracker.tracked_lists().is_empty());
    }

    #[test]
    fn tracked_lists_are_sorted() {
        let source = Arc::new(Counting::default());
        let mut tracker = DemandTracker::default();
        for raw in [30, 10, 20] {
            tracker.attach(ListId::new(raw), &source);
        }

        let ids: Vec<u64> = tracker.tracked_lists().iter().map(|id| id.raw()).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn key_derived_ids_are_stable() {
        assert_eq!(ListId::from_key("inbox"), ListId::from_key("inbox"));
        assert_ne!(ListId::from_key("inbox"), ListId::from_key("outbox"));
    }
}
