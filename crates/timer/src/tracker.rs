//! Subscription tracking with stale-marking diff semantics.
//!
//! A pass over the tracker expresses "this is exactly the set of objects I
//! care about now":
//!
//! ```text
//! mark_all_stale() → add(x) for each live x → clear_stale()
//! ```
//!
//! Objects added during the pass keep (or get) a registration; everything
//! else is released. Re-adding an object that is already registered revives
//! the existing registration instead of registering twice.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use ticktrack_core::EntryId;
use tracing::{debug, trace};

use crate::ports::{PropertyListener, PropertySource, WatchHandle};

/// Something whose objects can be watched one at a time.
pub trait Watchable<K, L>: Send + Sync {
    /// Register `listener` for `key`.
    fn watch(&self, key: &K, listener: L) -> WatchHandle;

    /// Release a registration.
    fn unwatch(&self, handle: WatchHandle);
}

impl<T: PropertySource + ?Sized> Watchable<EntryId, PropertyListener> for T {
    fn watch(&self, key: &EntryId, listener: PropertyListener) -> WatchHandle {
        self.watch_entry(*key, listener)
    }

    fn unwatch(&self, handle: WatchHandle) {
        self.unwatch_entry(handle)
    }
}

struct Subscription {
    handle: WatchHandle,
    stale: bool,
}

/// Registry of at most one subscription per observed object.
pub struct SubscriptionTracker<K, L, S: Watchable<K, L> + ?Sized> {
    source: Arc<S>,
    subscriptions: HashMap<K, Subscription>,
    _listener: std::marker::PhantomData<fn(L)>,
}

/// Tracker over per-entry property changes.
pub type EntrySubscriptions = SubscriptionTracker<EntryId, PropertyListener, dyn PropertySource>;

impl<K, L, S> SubscriptionTracker<K, L, S>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    S: Watchable<K, L> + ?Sized,
{
    /// Create an empty tracker over `source`.
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            subscriptions: HashMap::new(),
            _listener: std::marker::PhantomData,
        }
    }

    /// Flag every registered subscription as a removal candidate.
    pub fn mark_all_stale(&mut self) {
        for subscription in self.subscriptions.values_mut() {
            subscription.stale = true;
        }
    }

    /// Register `key`, or revive its existing registration.
    ///
    /// A revived registration keeps the listener it was created with;
    /// `listener` is dropped. Returns `true` if a new registration was made.
    pub fn add(&mut self, key: K, listener: L) -> bool {
        if let Some(existing) = self.subscriptions.get_mut(&key) {
            existing.stale = false;
            trace!(key = ?key, "subscription revived");
            return false;
        }

        let handle = self.source.watch(&key, listener);
        debug!(key = ?key, handle = handle.0, "subscription added");
        self.subscriptions.insert(key, Subscription { handle, stale: false });
        true
    }

    /// Release every subscription still flagged stale. Returns how many.
    pub fn clear_stale(&mut self) -> usize {
        let stale: Vec<K> = self
            .subscriptions
            .iter()
            .filter(|(_, s)| s.stale)
            .map(|(k, _)| k.clone())
            .collect();

        for key in &stale {
            if let Some(subscription) = self.subscriptions.remove(key) {
                debug!(key = ?key, handle = subscription.handle.0, "subscription released");
                self.source.unwatch(subscription.handle);
            }
        }

        stale.len()
    }

    /// Release everything.
    pub fn clear(&mut self) {
        self.mark_all_stale();
        self.clear_stale();
    }

    /// Whether `key` is registered.
    pub fn contains(&self, key: &K) -> bool {
        self.subscriptions.contains_key(key)
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl<K, L, S: Watchable<K, L> + ?Sized> Drop for SubscriptionTracker<K, L, S> {
    fn drop(&mut self) {
        for (_, subscription) in self.subscriptions.drain() {
            self.source.unwatch(subscription.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Listener = Arc<dyn Fn() + Send + Sync>;

    #[derive(Default)]
    struct FakeSource {
        next: Mutex<u64>,
        live: Mutex<HashMap<u64, (&'static str, Listener)>>,
        watch_calls: Mutex<usize>,
    }

    impl FakeSource {
        fn live_count(&self) -> usize {
            self.live.lock().unwrap().len()
        }

        fn fire(&self, key: &'static str) {
            let listeners: Vec<Listener> = self
                .live
                .lock()
                .unwrap()
                .values()
                .filter(|(k, _)| *k == key)
                .map(|(_, l)| l.clone())
                .collect();
            for listener in listeners {
                listener();
            }
        }
    }

    impl Watchable<&'static str, Listener> for FakeSource {
        fn watch(&self, key: &&'static str, listener: Listener) -> WatchHandle {
            let mut next = self.next.lock().unwrap();
            *next += 1;
            *self.watch_calls.lock().unwrap() += 1;
            self.live.lock().unwrap().insert(*next, (*key, listener));
            WatchHandle(*next)
        }

        fn unwatch(&self, handle: WatchHandle) {
            self.live.lock().unwrap().remove(&handle.0);
        }
    }

    fn counter() -> (Arc<Mutex<usize>>, Listener) {
        let hits = Arc::new(Mutex::new(0));
        let inner = hits.clone();
        (hits, Arc::new(move || *inner.lock().unwrap() += 1))
    }

    #[test]
    fn test_repeated_cycle_keeps_one_subscription() {
        let source = Arc::new(FakeSource::default());
        let mut tracker = SubscriptionTracker::new(source.clone());

        for _ in 0..5 {
            let (_, listener) = counter();
            tracker.mark_all_stale();
            tracker.add("a", listener);
            tracker.clear_stale();
            assert_eq!(tracker.len(), 1);
            assert_eq!(source.live_count(), 1);
        }

        assert_eq!(*source.watch_calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_cycle_leaves_exactly_the_added_set() {
        let source = Arc::new(FakeSource::default());
        let mut tracker = SubscriptionTracker::new(source.clone());

        tracker.add("a", counter().1);
        tracker.add("b", counter().1);

        tracker.mark_all_stale();
        tracker.add("b", counter().1);
        tracker.add("c", counter().1);
        assert_eq!(tracker.clear_stale(), 1);

        assert!(!tracker.contains(&"a"));
        assert!(tracker.contains(&"b"));
        assert!(tracker.contains(&"c"));
        assert_eq!(source.live_count(), 2);
    }

    #[test]
    fn test_released_listener_never_fires() {
        let source = Arc::new(FakeSource::default());
        let mut tracker = SubscriptionTracker::new(source.clone());
        let (hits, listener) = counter();

        tracker.add("a", listener);
        source.fire("a");
        assert_eq!(*hits.lock().unwrap(), 1);

        tracker.mark_all_stale();
        tracker.clear_stale();
        source.fire("a");
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn test_revive_keeps_first_listener() {
        let source = Arc::new(FakeSource::default());
        let mut tracker = SubscriptionTracker::new(source.clone());
        let (first_hits, first) = counter();
        let (second_hits, second) = counter();

        assert!(tracker.add("a", first));
        tracker.mark_all_stale();
        assert!(!tracker.add("a", second));
        tracker.clear_stale();

        source.fire("a");
        assert_eq!(*first_hits.lock().unwrap(), 1);
        assert_eq!(*second_hits.lock().unwrap(), 0);
    }

    #[test]
    fn test_clear_and_drop_release_everything() {
        let source = Arc::new(FakeSource::default());
        let mut tracker = SubscriptionTracker::new(source.clone());
        tracker.add("a", counter().1);
        tracker.add("b", counter().1);

        tracker.clear();
        assert!(tracker.is_empty());
        assert_eq!(source.live_count(), 0);

        tracker.add("c", counter().1);
        drop(tracker);
        assert_eq!(source.live_count(), 0);
    }
}
