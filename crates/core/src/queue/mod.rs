//! Eviction Queue Module
//!
//! Time-ordered multisets of entries awaiting eviction, consumed by the
//! queue-based schedulers:
//!
//! - `deadline_map` - sorted-map queue keyed by deadline (default)
//! - `binary_heap` - min-heap queue, pluggable alternative
//!
//! Entries sharing a deadline are disambiguated by a sequence number
//! assigned at insert time and stored in the entry's handle slot, so
//! removal is always identity-based and never drops a sibling.

use std::sync::Arc;
use std::time::Instant;

use crate::map::entry::TtlEntry;
use crate::map::EvictionSink;

pub mod binary_heap;
pub mod deadline_map;

pub use binary_heap::BinaryHeapQueue;
pub use deadline_map::DeadlineMapQueue;

/// A queue element: an entry awaiting eviction together with the hook back
/// into the map it lives in.
pub struct Scheduled<K, V> {
    entry: Arc<TtlEntry<K, V>>,
    sink: EvictionSink<K, V>,
}

impl<K, V> Scheduled<K, V> {
    pub(crate) fn new(entry: Arc<TtlEntry<K, V>>, sink: EvictionSink<K, V>) -> Self {
        Self { entry, sink }
    }

    /// The entry awaiting eviction.
    pub fn entry(&self) -> &Arc<TtlEntry<K, V>> {
        &self.entry
    }

    /// The entry's deadline; always `Some` for a queued element.
    pub fn deadline(&self) -> Option<Instant> {
        self.entry.deadline()
    }
}

impl<K: Eq + std::hash::Hash, V> Scheduled<K, V> {
    /// Evicts the entry from its map. The caller owns the queue removal, so
    /// the map side does not cancel the schedule again.
    pub fn fire(&self) {
        self.sink.evict(&self.entry);
    }
}

/// A time-ordered multiset of entries awaiting eviction.
///
/// Implementations only ever hold evictible entries; the scheduling
/// envelope filters permanent ones out before they reach the queue.
pub trait EvictionQueue<K, V>: Send + Sync {
    /// Whether any evictions are pending.
    fn has_entries(&self) -> bool;

    /// The earliest pending deadline, or `None` when empty.
    fn next_deadline(&self) -> Option<Instant>;

    /// Inserts an element at its deadline.
    fn insert(&self, item: Scheduled<K, V>);

    /// Removes exactly this entry, identified by the sequence number in its
    /// handle slot. Unknown entries (already drained, never inserted) are
    /// ignored.
    fn remove(&self, entry: &Arc<TtlEntry<K, V>>);

    /// Removes every element whose deadline has passed and fires it,
    /// returning how many were evicted. An element is either observed by a
    /// given drain or left schedulable for the next one.
    fn drain_expired(&self) -> usize;
}
