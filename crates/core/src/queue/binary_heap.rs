//! Min-heap eviction queue. Identity-based removal is linear over the
//! heap, which makes it slower than the sorted-map queue under churn; it
//! exists to keep the queue seam honest.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::map::entry::{EntryHandle, TtlEntry};
use crate::queue::{EvictionQueue, Scheduled};

struct Slot<K, V> {
    deadline: Instant,
    seq: u64,
    item: Scheduled<K, V>,
}

impl<K, V> PartialEq for Slot<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<K, V> Eq for Slot<K, V> {}

impl<K, V> PartialOrd for Slot<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<K, V> Ord for Slot<K, V> {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (self.deadline, self.seq).cmp(&(other.deadline, other.seq))
    }
}

/// An [`EvictionQueue`] backed by a binary min-heap ordered by
/// `(deadline, sequence)`.
pub struct BinaryHeapQueue<K, V> {
    entries: Mutex<BinaryHeap<Reverse<Slot<K, V>>>>,
    seq: AtomicU64,
}

impl<K, V> BinaryHeapQueue<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Pre-sizes the heap for roughly `capacity` pending evictions.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(BinaryHeap::with_capacity(capacity)),
            seq: AtomicU64::new(0),
        }
    }
}

impl<K, V> Default for BinaryHeapQueue<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> EvictionQueue<K, V> for BinaryHeapQueue<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Send + Sync,
{
    fn has_entries(&self) -> bool {
        !self.entries.lock().is_empty()
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.entries.lock().peek().map(|Reverse(slot)| slot.deadline)
    }

    fn insert(&self, item: Scheduled<K, V>) {
        let Some(deadline) = item.deadline() else {
            return;
        };
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        item.entry().bind_handle(EntryHandle::Seq(seq));
        self.entries.lock().push(Reverse(Slot {
            deadline,
            seq,
            item,
        }));
    }

    fn remove(&self, entry: &Arc<TtlEntry<K, V>>) {
        let Some(EntryHandle::Seq(seq)) = entry.handle() else {
            return;
        };
        self.entries.lock().retain(|Reverse(slot)| slot.seq != *seq);
    }

    fn drain_expired(&self) -> usize {
        let now = Instant::now();
        let due: Vec<Scheduled<K, V>> = {
            let mut entries = self.entries.lock();
            let mut due = Vec::new();
            while entries
                .peek()
                .is_some_and(|Reverse(slot)| slot.deadline < now)
            {
                if let Some(Reverse(slot)) = entries.pop() {
                    due.push(slot.item);
                }
            }
            due
        };
        for item in &due {
            item.fire();
        }
        due.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::EvictionSink;
    use std::time::Duration;

    fn entry(key: u32, ttl: Duration) -> Arc<TtlEntry<u32, &'static str>> {
        Arc::new(TtlEntry::new(key, "v", ttl))
    }

    #[test]
    fn test_orders_by_deadline() {
        let queue = BinaryHeapQueue::new();
        let late = entry(1, Duration::from_secs(60));
        let early = entry(2, Duration::from_secs(5));
        queue.insert(Scheduled::new(Arc::clone(&late), EvictionSink::detached()));
        queue.insert(Scheduled::new(Arc::clone(&early), EvictionSink::detached()));
        assert_eq!(queue.next_deadline(), early.deadline());
    }

    #[test]
    fn test_remove_spares_deadline_siblings() {
        let queue = BinaryHeapQueue::new();
        let a = entry(1, Duration::from_secs(30));
        let b = entry(2, Duration::from_secs(30));
        queue.insert(Scheduled::new(Arc::clone(&a), EvictionSink::detached()));
        queue.insert(Scheduled::new(Arc::clone(&b), EvictionSink::detached()));
        queue.remove(&a);
        assert!(queue.has_entries());
        queue.remove(&b);
        assert!(!queue.has_entries());
    }

    #[test]
    fn test_drain_stops_at_future_deadlines() {
        let queue = BinaryHeapQueue::new();
        queue.insert(Scheduled::new(
            entry(1, Duration::from_nanos(1)),
            EvictionSink::detached(),
        ));
        queue.insert(Scheduled::new(
            entry(2, Duration::from_secs(60)),
            EvictionSink::detached(),
        ));
        std::thread::sleep(Duration::from_millis(1));
        assert_eq!(queue.drain_expired(), 1);
        assert!(queue.has_entries());
    }
}
