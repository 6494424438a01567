//! Sorted-by-deadline eviction queue, the default for queue-based
//! schedulers. Elements live in a `BTreeMap` keyed by `(deadline, seq)`;
//! the sequence number keeps same-deadline entries distinct.

use std::collections::BTreeMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::map::entry::{EntryHandle, TtlEntry};
use crate::queue::{EvictionQueue, Scheduled};

/// The default [`EvictionQueue`]: a mutex-guarded ordered map from
/// `(deadline, sequence)` to the scheduled element. Peeking the earliest
/// deadline and draining a due prefix are both cheap; removal is a direct
/// keyed lookup.
pub struct DeadlineMapQueue<K, V> {
    entries: Mutex<BTreeMap<(Instant, u64), Scheduled<K, V>>>,
    seq: AtomicU64,
}

impl<K, V> DeadlineMapQueue<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            seq: AtomicU64::new(0),
        }
    }
}

impl<K, V> Default for DeadlineMapQueue<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> EvictionQueue<K, V> for DeadlineMapQueue<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Send + Sync,
{
    fn has_entries(&self) -> bool {
        !self.entries.lock().is_empty()
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.entries.lock().first_key_value().map(|(key, _)| key.0)
    }

    fn insert(&self, item: Scheduled<K, V>) {
        let Some(deadline) = item.deadline() else {
            return;
        };
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        item.entry().bind_handle(EntryHandle::Seq(seq));
        self.entries.lock().insert((deadline, seq), item);
    }

    fn remove(&self, entry: &Arc<TtlEntry<K, V>>) {
        let (Some(deadline), Some(EntryHandle::Seq(seq))) = (entry.deadline(), entry.handle())
        else {
            return;
        };
        self.entries.lock().remove(&(deadline, *seq));
    }

    fn drain_expired(&self) -> usize {
        let due: Vec<Scheduled<K, V>> = {
            let mut entries = self.entries.lock();
            let pending = entries.split_off(&(Instant::now(), 0));
            std::mem::replace(&mut *entries, pending)
                .into_values()
                .collect()
        };
        // Fired outside the lock so eviction callbacks never contend with
        // concurrent schedule/cancel traffic on the queue.
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

    fn scheduled(ttl: Duration) -> Scheduled<u32, &'static str> {
        Scheduled::new(
            Arc::new(TtlEntry::new(1, "a", ttl)),
            EvictionSink::detached(),
        )
    }

    #[test]
    fn test_empty_queue() {
        let queue: DeadlineMapQueue<u32, &str> = DeadlineMapQueue::new();
        assert!(!queue.has_entries());
        assert!(queue.next_deadline().is_none());
        assert_eq!(queue.drain_expired(), 0);
    }

    #[test]
    fn test_next_deadline_is_earliest() {
        let queue = DeadlineMapQueue::new();
        let late = scheduled(Duration::from_secs(60));
        let early = scheduled(Duration::from_secs(10));
        let early_deadline = early.deadline();
        queue.insert(late);
        queue.insert(early);
        assert_eq!(queue.next_deadline(), early_deadline);
    }

    #[test]
    fn test_remove_is_identity_based() {
        let queue = DeadlineMapQueue::new();
        // Two distinct entries that may land on the same deadline.
        let first = Arc::new(TtlEntry::new(1u32, "a", Duration::from_secs(30)));
        let second = Arc::new(TtlEntry::new(2u32, "b", Duration::from_secs(30)));
        queue.insert(Scheduled::new(Arc::clone(&first), EvictionSink::detached()));
        queue.insert(Scheduled::new(Arc::clone(&second), EvictionSink::detached()));
        queue.remove(&first);
        assert!(queue.has_entries());
        queue.remove(&second);
        assert!(!queue.has_entries());
    }

    #[test]
    fn test_drain_takes_only_due_entries() {
        let queue = DeadlineMapQueue::new();
        queue.insert(scheduled(Duration::from_nanos(1)));
        queue.insert(scheduled(Duration::from_nanos(1)));
        queue.insert(scheduled(Duration::from_secs(60)));
        std::thread::sleep(Duration::from_millis(1));
        assert_eq!(queue.drain_expired(), 2);
        assert!(queue.has_entries());
    }

    #[test]
    fn test_permanent_entries_are_rejected() {
        let queue = DeadlineMapQueue::new();
        queue.insert(scheduled(Duration::ZERO));
        assert!(!queue.has_entries());
    }
}
