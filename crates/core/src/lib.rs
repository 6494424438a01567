//! Kestrel - a concurrent key-value map with per-entry time-to-live.
//!
//! Entries inserted with a TTL disappear when it elapses, without a
//! read-side cleanup pass and without serializing writers through a global
//! lock. Storage lives in a concurrent hash map delegate; removal timing
//! is delegated to a pluggable [`EvictionScheduler`]:
//!
//! - [`PerEntryTimerScheduler`] - one timer per entry
//! - [`IntervalScheduler`] - periodic queue drain at a fixed interval
//! - [`DeadlineScheduler`] - one task armed at the next deadline
//! - [`WorkerThreadScheduler`] - dedicated eviction thread (the default)
//! - [`NoopScheduler`] - no background work, lazy expiry only
//!
//! Whatever the scheduler does, any read observing an expired entry
//! removes it on the spot, so stale values are never returned.
//!
//! ```
//! use std::time::Duration;
//! use kestrel_core::TtlMap;
//!
//! let sessions: TtlMap<String, u64> = TtlMap::new();
//! sessions.insert_with_ttl("alice".into(), 42, Duration::from_millis(50));
//! assert_eq!(sessions.get(&"alice".into()), Some(42));
//! std::thread::sleep(Duration::from_millis(120));
//! assert_eq!(sessions.get(&"alice".into()), None);
//! ```

pub mod error;
pub mod map;
pub mod queue;
pub mod scheduler;
pub mod timer;

pub use error::ConfigError;
pub use map::{EvictionSink, TtlEntry, TtlMap};
pub use queue::{BinaryHeapQueue, DeadlineMapQueue, EvictionQueue, Scheduled};
pub use scheduler::{
    DeadlineScheduler, EvictionScheduler, IntervalScheduler, NoopScheduler,
    PerEntryTimerScheduler, WorkerThreadScheduler,
};
pub use timer::{TimerExecutor, TimerTask};
