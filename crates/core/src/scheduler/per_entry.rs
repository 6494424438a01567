//! One timer per evictible entry on a shared [`TimerExecutor`]. The
//! cheapest variant to cancel against, at the cost of one outstanding
//! timer per entry, which makes it the slowest on write-heavy churn.

use std::hash::Hash;
use std::sync::Arc;

use crate::map::entry::{EntryHandle, TtlEntry};
use crate::map::EvictionSink;
use crate::scheduler::EvictionScheduler;
use crate::timer::TimerExecutor;

/// An [`EvictionScheduler`] that arms a dedicated one-shot timer for every
/// evictible entry and stores the cancellation handle in the entry's
/// handle slot.
///
/// The timer task holds only a weak reference to its entry, so a long TTL
/// on an entry the map has already dropped does not pin it in memory.
///
/// After [`shutdown`](EvictionScheduler::shutdown) both scheduling and
/// cancellation are silently ignored; affected entries remain until lazily
/// expired. Shutting down also stops the executor, shared or not, exactly
/// like the other executor-backed variants.
pub struct PerEntryTimerScheduler {
    executor: Arc<TimerExecutor>,
}

impl Default for PerEntryTimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PerEntryTimerScheduler {
    /// Creates the scheduler with an executor of its own.
    pub fn new() -> Self {
        Self::with_executor(Arc::new(TimerExecutor::new()))
    }

    /// Creates the scheduler on a shared executor.
    pub fn with_executor(executor: Arc<TimerExecutor>) -> Self {
        Self { executor }
    }
}

impl<K, V> EvictionScheduler<K, V> for PerEntryTimerScheduler
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn schedule_eviction(&self, entry: &Arc<TtlEntry<K, V>>, sink: &EvictionSink<K, V>) {
        let Some(deadline) = entry.deadline() else {
            return;
        };
        let target = Arc::downgrade(entry);
        let sink = sink.clone();
        let task = self.executor.schedule_at(deadline, move || {
            if let Some(entry) = target.upgrade() {
                sink.evict(&entry);
            }
        });
        entry.bind_handle(EntryHandle::Timer(task));
    }

    fn cancel_eviction(&self, entry: &Arc<TtlEntry<K, V>>) {
        if let Some(EntryHandle::Timer(task)) = entry.handle() {
            task.cancel();
        }
    }

    fn shutdown(&self) {
        self.executor.shutdown();
    }
}
