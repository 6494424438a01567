//! Entry Metadata Module
//!
//! The value object stored in the map delegate: the user's key and value
//! together with the expiry deadline derived at construction time and the
//! scheduler-opaque handle slot.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::timer::TimerTask;

/// State a scheduler attaches to an entry it has accepted.
///
/// The slot is written at most once per entry lifetime and only the
/// scheduler that wrote it interprets it: the per-entry-timer scheduler
/// stores the cancellation handle of the entry's timer, the eviction
/// queues store the sequence number that disambiguates entries sharing a
/// deadline.
pub(crate) enum EntryHandle {
    /// Cancellation handle for a dedicated one-shot timer.
    Timer(TimerTask),
    /// Insertion sequence number assigned by an eviction queue.
    Seq(u64),
}

/// An entry held by a [`TtlMap`](crate::TtlMap).
///
/// The deadline is computed exactly once at construction; refreshing a
/// mapping's value or TTL always produces a new entry that replaces the
/// old one in the delegate. Entries are shared as `Arc<TtlEntry>` and all
/// identity comparisons (delegate CAS, queue removal) use `Arc::ptr_eq`,
/// so two entries for the same key are never confused.
pub struct TtlEntry<K, V> {
    key: K,
    /// Written only through `set_value`; readers clone under the shared lock.
    value: RwLock<V>,
    ttl: Duration,
    /// `None` means the entry is permanent.
    deadline: Option<Instant>,
    handle: OnceLock<EntryHandle>,
}

impl<K, V> TtlEntry<K, V> {
    /// Creates an entry expiring `ttl` from now. A zero TTL (and a TTL too
    /// large for the monotonic clock to represent) yields a permanent entry.
    pub(crate) fn new(key: K, value: V, ttl: Duration) -> Self {
        let deadline = if ttl.is_zero() {
            None
        } else {
            Instant::now().checked_add(ttl)
        };
        Self {
            key,
            value: RwLock::new(value),
            ttl,
            deadline,
            handle: OnceLock::new(),
        }
    }

    /// The key this entry is stored under.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The TTL the entry was created with.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The absolute monotonic deadline, or `None` for a permanent entry.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the entry participates in eviction at all.
    pub fn is_evictible(&self) -> bool {
        self.deadline.is_some()
    }

    /// Whether the deadline has passed. Once true, stays true.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// A clone of the current value.
    pub fn value(&self) -> V
    where
        V: Clone,
    {
        self.value.read().clone()
    }

    /// Replaces the value in place, returning the previous one. Serializes
    /// with itself through the entry's write lock; the deadline is unchanged.
    pub fn set_value(&self, value: V) -> V {
        std::mem::replace(&mut *self.value.write(), value)
    }

    pub(crate) fn value_matches(&self, other: &V) -> bool
    where
        V: PartialEq,
    {
        *self.value.read() == *other
    }

    /// Attaches scheduler state to the entry. A second write is ignored;
    /// the facade schedules each entry at most once.
    pub(crate) fn bind_handle(&self, handle: EntryHandle) {
        let _ = self.handle.set(handle);
    }

    pub(crate) fn handle(&self) -> Option<&EntryHandle> {
        self.handle.get()
    }
}
