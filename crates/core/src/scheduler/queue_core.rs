//! Shared schedule/cancel/drain envelope for the queue-based schedulers.
//! Holds no timer state of its own; each variant layers its own driver on
//! top.

use std::sync::Arc;

use tracing::debug;

use crate::map::entry::TtlEntry;
use crate::map::EvictionSink;
use crate::queue::{EvictionQueue, Scheduled};

pub(crate) struct QueueCore<K, V> {
    queue: Box<dyn EvictionQueue<K, V>>,
}

impl<K, V> QueueCore<K, V> {
    pub(crate) fn new(queue: Box<dyn EvictionQueue<K, V>>) -> Self {
        Self { queue }
    }

    /// Enqueues an evictible entry at its deadline. Returns whether the
    /// entry was accepted, i.e. whether the caller should reconsider its
    /// driver state.
    pub(crate) fn schedule(&self, entry: &Arc<TtlEntry<K, V>>, sink: &EvictionSink<K, V>) -> bool {
        if !entry.is_evictible() {
            return false;
        }
        self.queue
            .insert(Scheduled::new(Arc::clone(entry), sink.clone()));
        true
    }

    /// Removes an evictible entry from the queue, tolerating entries
    /// already drained. Returns whether the entry was eligible.
    pub(crate) fn cancel(&self, entry: &Arc<TtlEntry<K, V>>) -> bool {
        if !entry.is_evictible() {
            return false;
        }
        self.queue.remove(entry);
        true
    }

    /// Evicts everything due. Returns whether anything was evicted.
    pub(crate) fn drain(&self) -> bool {
        let removed = self.queue.drain_expired();
        if removed > 0 {
            debug!(removed, "drained expired entries");
        }
        removed > 0
    }

    pub(crate) fn has_entries(&self) -> bool {
        self.queue.has_entries()
    }

    pub(crate) fn next_deadline(&self) -> Option<std::time::Instant> {
        self.queue.next_deadline()
    }
}
