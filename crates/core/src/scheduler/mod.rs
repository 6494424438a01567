//! Eviction Scheduler Module
//!
//! Strategies that turn "this entry expires at its deadline" into an
//! actual removal from the map:
//!
//! - `per_entry` - one timer per entry on a shared executor
//! - `interval` - one periodic task draining the eviction queue
//! - `deadline` - one single-shot task re-armed at the next deadline
//! - `worker` - a dedicated thread waiting on a condition variable
//! - `noop` - no scheduling at all, lazy expiry only
//!
//! The queue-based variants (`interval`, `deadline`, `worker`) share the
//! schedule/cancel/drain envelope in `queue_core` and differ only in how
//! they drive the drain.

use std::sync::Arc;

use crate::map::entry::TtlEntry;
use crate::map::EvictionSink;

pub mod deadline;
pub mod interval;
pub mod noop;
pub mod per_entry;
pub mod queue_core;
pub mod worker;

pub use deadline::DeadlineScheduler;
pub use interval::IntervalScheduler;
pub use noop::NoopScheduler;
pub use per_entry::PerEntryTimerScheduler;
pub use worker::WorkerThreadScheduler;

/// A strategy for evicting entries when their deadlines pass.
///
/// The map facade calls [`schedule_eviction`] exactly once when an
/// evictible entry enters the delegate and [`cancel_eviction`] exactly
/// once when it leaves (scheduler-driven expiry counts as its own
/// cancellation: the drain already removed the queue state). Permanent
/// entries are ignored by every operation.
///
/// [`schedule_eviction`]: EvictionScheduler::schedule_eviction
/// [`cancel_eviction`]: EvictionScheduler::cancel_eviction
pub trait EvictionScheduler<K, V>: Send + Sync {
    /// Arranges for `entry` to be evicted through `sink` at or after its
    /// deadline. Must do nothing for permanent entries.
    fn schedule_eviction(&self, entry: &Arc<TtlEntry<K, V>>, sink: &EvictionSink<K, V>);

    /// Releases any timer or queue state held for `entry`. Must tolerate
    /// entries whose expiry already fired and permanent entries.
    fn cancel_eviction(&self, entry: &Arc<TtlEntry<K, V>>);

    /// Releases the scheduler's threads and timers. Pending evictions are
    /// dropped, not drained. Further calls are ignored; see the module
    /// documentation of each variant for the post-shutdown contract.
    fn shutdown(&self);
}
