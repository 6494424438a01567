//! Map Facade Module
//!
//! [`TtlMap`] decorates a concurrent hash map delegate with per-entry
//! time-to-live. Storage mutations go to the delegate; timer arming and
//! disarming go to the [`EvictionScheduler`] the map was built with.
//!
//! Every read that observes an expired entry removes it on the spot
//! (lazy expiry), so callers never see stale values regardless of how
//! promptly the scheduler fires.

use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::mapref::entry::Entry as DashEntry;
use dashmap::DashMap;

use crate::scheduler::{EvictionScheduler, WorkerThreadScheduler};

pub mod entry;

pub use entry::TtlEntry;

pub(crate) struct MapInner<K, V> {
    delegate: DashMap<K, Arc<TtlEntry<K, V>>>,
    scheduler: Arc<dyn EvictionScheduler<K, V>>,
}

impl<K: Eq + Hash, V> MapInner<K, V> {
    /// Removes exactly `entry` from the delegate. Racing removals (a user
    /// operation, a concurrent lazy expiry, another scheduler firing) make
    /// this a no-op; the delegate's compare-and-swap arbitrates.
    fn evict(&self, entry: &Arc<TtlEntry<K, V>>, cancel_pending: bool) {
        self.delegate
            .remove_if(entry.key(), |_, current| Arc::ptr_eq(current, entry));
        if cancel_pending {
            self.scheduler.cancel_eviction(entry);
        }
    }

    /// Lazy-expiry step shared by the read paths: evicts the entry if its
    /// deadline has passed and reports whether it did.
    fn evict_if_expired(&self, entry: &Arc<TtlEntry<K, V>>) -> bool {
        let expired = entry.is_expired();
        if expired {
            self.evict(entry, true);
        }
        expired
    }
}

/// The hook a scheduler uses to remove an expired entry from its map.
///
/// Holds only a non-owning reference to the map, so queued timers never
/// keep a dropped map (or its entries) alive; firing after the map is gone
/// is a no-op. Eviction through the sink does not re-cancel the schedule:
/// the scheduler draining the entry already owns the queue removal.
pub struct EvictionSink<K, V> {
    map: Weak<MapInner<K, V>>,
}

impl<K, V> Clone for EvictionSink<K, V> {
    fn clone(&self) -> Self {
        Self {
            map: Weak::clone(&self.map),
        }
    }
}

impl<K: Eq + Hash, V> EvictionSink<K, V> {
    /// Removes `entry` from the map if it is still the live entry for its
    /// key.
    pub fn evict(&self, entry: &Arc<TtlEntry<K, V>>) {
        if let Some(map) = self.map.upgrade() {
            map.evict(entry, false);
        }
    }
}

impl<K, V> EvictionSink<K, V> {
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self { map: Weak::new() }
    }
}

/// A concurrent map whose entries may carry a time-to-live.
///
/// Cloning the map is cheap and yields another handle onto the same
/// underlying state. The scheduler decides when expired entries are
/// physically removed; independent of it, any read observing a passed
/// deadline treats the entry as absent and removes it.
///
/// `len` is weakly consistent: it may transiently count entries that have
/// expired but not yet been evicted.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use kestrel_core::TtlMap;
///
/// let map: TtlMap<u32, String> = TtlMap::new();
/// map.insert_with_ttl(1, "session".to_string(), Duration::from_secs(30));
/// assert_eq!(map.get(&1).as_deref(), Some("session"));
/// ```
pub struct TtlMap<K, V> {
    inner: Arc<MapInner<K, V>>,
    sink: EvictionSink<K, V>,
}

impl<K, V> Clone for TtlMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            sink: self.sink.clone(),
        }
    }
}

impl<K, V> Default for TtlMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TtlMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a map driven by a [`WorkerThreadScheduler`] of its own.
    pub fn new() -> Self {
        Self::with_scheduler(Arc::new(WorkerThreadScheduler::new()))
    }

    /// Creates a map using the given scheduler. The scheduler may be shared
    /// between maps; shutting it down remains its owner's responsibility.
    pub fn with_scheduler(scheduler: Arc<dyn EvictionScheduler<K, V>>) -> Self {
        Self::build(DashMap::new(), scheduler)
    }

    /// Like [`with_scheduler`](Self::with_scheduler), with a pre-sized
    /// delegate.
    pub fn with_capacity(capacity: usize, scheduler: Arc<dyn EvictionScheduler<K, V>>) -> Self {
        Self::build(DashMap::with_capacity(capacity), scheduler)
    }

    fn build(
        delegate: DashMap<K, Arc<TtlEntry<K, V>>>,
        scheduler: Arc<dyn EvictionScheduler<K, V>>,
    ) -> Self {
        let inner = Arc::new(MapInner {
            delegate,
            scheduler,
        });
        let sink = EvictionSink {
            map: Arc::downgrade(&inner),
        };
        Self { inner, sink }
    }

    /// Returns the live value for `key`. An entry whose deadline has passed
    /// is evicted and reported absent.
    pub fn get(&self, key: &K) -> Option<V> {
        let entry = {
            let guard = self.inner.delegate.get(key)?;
            Arc::clone(guard.value())
        };
        if self.inner.evict_if_expired(&entry) {
            None
        } else {
            Some(entry.value())
        }
    }

    /// Whether `key` maps to a live value.
    pub fn contains_key(&self, key: &K) -> bool {
        let Some(entry) = self
            .inner
            .delegate
            .get(key)
            .map(|guard| Arc::clone(guard.value()))
        else {
            return false;
        };
        !self.inner.evict_if_expired(&entry)
    }

    /// Whether at least one live entry holds a value equal to `value`.
    /// Expired entries holding an equal value are lazily evicted as they
    /// are observed.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        let mut stale = Vec::new();
        let mut found = false;
        for guard in self.inner.delegate.iter() {
            let entry = guard.value();
            if entry.value_matches(value) {
                if entry.is_expired() {
                    stale.push(Arc::clone(entry));
                } else {
                    found = true;
                    break;
                }
            }
        }
        // Evicted after the scan so no delegate shard lock is held while
        // removing.
        for entry in stale {
            self.inner.evict_if_expired(&entry);
        }
        found
    }

    /// Inserts a permanent mapping. Equivalent to
    /// [`insert_with_ttl`](Self::insert_with_ttl) with a zero TTL.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.insert_with_ttl(key, value, Duration::ZERO)
    }

    /// Maps `key` to `value` for `ttl` (zero meaning forever), replacing
    /// and unscheduling any previous entry. Returns the previous live
    /// value.
    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) -> Option<V> {
        let entry = Arc::new(TtlEntry::new(key.clone(), value, ttl));
        let old = self.inner.delegate.insert(key, Arc::clone(&entry));
        if let Some(old) = &old {
            self.inner.scheduler.cancel_eviction(old);
        }
        self.inner.scheduler.schedule_eviction(&entry, &self.sink);
        old.filter(|old| !old.is_expired()).map(|old| old.value())
    }

    /// Permanent-mapping form of
    /// [`insert_if_absent_with_ttl`](Self::insert_if_absent_with_ttl).
    pub fn insert_if_absent(&self, key: K, value: V) -> Option<V> {
        self.insert_if_absent_with_ttl(key, value, Duration::ZERO)
    }

    /// Inserts only if `key` has no live mapping, returning the existing
    /// live value otherwise. An expired occupant is evicted and the insert
    /// retried, so callers racing over a stale slot elect exactly one
    /// winner.
    pub fn insert_if_absent_with_ttl(&self, key: K, value: V, ttl: Duration) -> Option<V> {
        loop {
            let entry = Arc::new(TtlEntry::new(key.clone(), value.clone(), ttl));
            let existing = match self.inner.delegate.entry(key.clone()) {
                DashEntry::Vacant(slot) => {
                    slot.insert(Arc::clone(&entry));
                    None
                }
                DashEntry::Occupied(slot) => Some(Arc::clone(slot.get())),
            };
            match existing {
                None => {
                    self.inner.scheduler.schedule_eviction(&entry, &self.sink);
                    return None;
                }
                Some(occupant) => {
                    if self.inner.evict_if_expired(&occupant) {
                        continue;
                    }
                    return Some(occupant.value());
                }
            }
        }
    }

    /// Permanent-mapping form of
    /// [`replace_with_ttl`](Self::replace_with_ttl).
    pub fn replace(&self, key: &K, value: V) -> Option<V> {
        self.replace_with_ttl(key, value, Duration::ZERO)
    }

    /// Replaces the live entry for `key`, if any, returning its value. The
    /// swap is identity-based: if the entry observed changes underneath
    /// (concurrent write or eviction), nothing is replaced.
    pub fn replace_with_ttl(&self, key: &K, value: V, ttl: Duration) -> Option<V> {
        let old = self
            .inner
            .delegate
            .get(key)
            .map(|guard| Arc::clone(guard.value()))?;
        if self.inner.evict_if_expired(&old) {
            return None;
        }
        let entry = Arc::new(TtlEntry::new(key.clone(), value, ttl));
        let swapped = match self.inner.delegate.entry(key.clone()) {
            DashEntry::Occupied(mut slot) if Arc::ptr_eq(slot.get(), &old) => {
                slot.insert(Arc::clone(&entry));
                true
            }
            _ => false,
        };
        if swapped {
            self.inner.scheduler.cancel_eviction(&old);
            self.inner.scheduler.schedule_eviction(&entry, &self.sink);
            Some(old.value())
        } else {
            None
        }
    }

    /// Permanent-mapping form of
    /// [`replace_if_equal_with_ttl`](Self::replace_if_equal_with_ttl).
    pub fn replace_if_equal(&self, key: &K, old_value: &V, new_value: V) -> bool
    where
        V: PartialEq,
    {
        self.replace_if_equal_with_ttl(key, old_value, new_value, Duration::ZERO)
    }

    /// Replaces the live entry for `key` only if its value equals
    /// `old_value`. Returns whether the replacement happened.
    pub fn replace_if_equal_with_ttl(
        &self,
        key: &K,
        old_value: &V,
        new_value: V,
        ttl: Duration,
    ) -> bool
    where
        V: PartialEq,
    {
        let Some(old) = self
            .inner
            .delegate
            .get(key)
            .map(|guard| Arc::clone(guard.value()))
        else {
            return false;
        };
        if self.inner.evict_if_expired(&old) || !old.value_matches(old_value) {
            return false;
        }
        let entry = Arc::new(TtlEntry::new(key.clone(), new_value, ttl));
        let swapped = match self.inner.delegate.entry(key.clone()) {
            DashEntry::Occupied(mut slot) if Arc::ptr_eq(slot.get(), &old) => {
                slot.insert(Arc::clone(&entry));
                true
            }
            _ => false,
        };
        if swapped {
            self.inner.scheduler.cancel_eviction(&old);
            self.inner.scheduler.schedule_eviction(&entry, &self.sink);
        }
        swapped
    }

    /// Removes the mapping for `key`, returning its value if it was still
    /// live.
    pub fn remove(&self, key: &K) -> Option<V> {
        let (_, old) = self.inner.delegate.remove(key)?;
        self.inner.scheduler.cancel_eviction(&old);
        if old.is_expired() {
            None
        } else {
            Some(old.value())
        }
    }

    /// Removes the mapping for `key` only if its live value equals
    /// `expected`. Returns whether this call removed it; a scheduler
    /// eviction or concurrent write racing in first makes this a no-op.
    pub fn remove_if_equal(&self, key: &K, expected: &V) -> bool
    where
        V: PartialEq,
    {
        let Some(old) = self
            .inner
            .delegate
            .get(key)
            .map(|guard| Arc::clone(guard.value()))
        else {
            return false;
        };
        if self.inner.evict_if_expired(&old) || !old.value_matches(expected) {
            return false;
        }
        let removed = self
            .inner
            .delegate
            .remove_if(key, |_, current| Arc::ptr_eq(current, &old))
            .is_some();
        self.inner.scheduler.cancel_eviction(&old);
        removed
    }

    /// Cancels every pending eviction, then empties the delegate. A timer
    /// firing concurrently finds its entry gone and becomes a no-op.
    pub fn clear(&self) {
        for guard in self.inner.delegate.iter() {
            self.inner.scheduler.cancel_eviction(guard.value());
        }
        self.inner.delegate.clear();
    }

    /// The number of stored entries, including expired ones not yet
    /// evicted.
    pub fn len(&self) -> usize {
        self.inner.delegate.len()
    }

    /// Whether the delegate holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.inner.delegate.is_empty()
    }

    /// A weakly consistent snapshot iterator over live entries. Expired
    /// entries are hidden but not evicted.
    pub fn iter(&self) -> impl Iterator<Item = (K, V)> + '_ {
        self.inner
            .delegate
            .iter()
            .filter(|guard| !guard.value().is_expired())
            .map(|guard| (guard.key().clone(), guard.value().value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::NoopScheduler;

    fn lazy_map() -> TtlMap<u32, String> {
        TtlMap::with_scheduler(Arc::new(NoopScheduler))
    }

    #[test]
    fn test_insert_get_roundtrip() {
        let map = lazy_map();
        assert_eq!(map.insert(1, "a".into()), None);
        assert_eq!(map.get(&1).as_deref(), Some("a"));
        assert_eq!(map.insert(1, "b".into()).as_deref(), Some("a"));
        assert_eq!(map.get(&1).as_deref(), Some("b"));
    }

    #[test]
    fn test_replace_absent_key_is_noop() {
        let map = lazy_map();
        assert_eq!(map.replace(&1, "a".into()), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_replace_if_equal_checks_value() {
        let map = lazy_map();
        map.insert(1, "a".into());
        assert!(!map.replace_if_equal(&1, &"x".into(), "b".into()));
        assert!(map.replace_if_equal(&1, &"a".into(), "b".into()));
        assert_eq!(map.get(&1).as_deref(), Some("b"));
    }

    #[test]
    fn test_remove_if_equal_checks_value() {
        let map = lazy_map();
        map.insert(1, "a".into());
        assert!(!map.remove_if_equal(&1, &"b".into()));
        assert!(map.remove_if_equal(&1, &"a".into()));
        assert_eq!(map.get(&1), None);
    }

    #[test]
    fn test_clone_shares_state() {
        let map = lazy_map();
        let other = map.clone();
        map.insert(1, "a".into());
        assert_eq!(other.get(&1).as_deref(), Some("a"));
    }

    #[test]
    fn test_iter_hides_expired_without_evicting() {
        let map = lazy_map();
        map.insert(1, "live".into());
        map.insert_with_ttl(2, "stale".into(), Duration::from_nanos(1));
        std::thread::sleep(Duration::from_millis(1));
        let snapshot: Vec<_> = map.iter().collect();
        assert_eq!(snapshot, vec![(1, "live".to_string())]);
        // Hidden, not evicted: the slot is still occupied.
        assert_eq!(map.len(), 2);
    }
}
