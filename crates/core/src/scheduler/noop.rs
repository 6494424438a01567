//! A scheduler that schedules nothing. Expired entries disappear only
//! through lazy expiry on reads, which makes it useful for tests and for
//! maps that must not own background threads.

use std::sync::Arc;

use crate::map::entry::TtlEntry;
use crate::map::EvictionSink;
use crate::scheduler::EvictionScheduler;

/// The do-nothing [`EvictionScheduler`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScheduler;

impl<K, V> EvictionScheduler<K, V> for NoopScheduler {
    fn schedule_eviction(&self, _entry: &Arc<TtlEntry<K, V>>, _sink: &EvictionSink<K, V>) {}

    fn cancel_eviction(&self, _entry: &Arc<TtlEntry<K, V>>) {}

    fn shutdown(&self) {}
}
