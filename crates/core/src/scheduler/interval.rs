//! Fixed-interval drain scheduler. A single periodic task sweeps the
//! eviction queue; it is armed when the queue first becomes non-empty and
//! disarmed when it empties, so an idle map costs nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{ConfigError, Result};
use crate::map::entry::TtlEntry;
use crate::map::EvictionSink;
use crate::queue::{DeadlineMapQueue, EvictionQueue};
use crate::scheduler::queue_core::QueueCore;
use crate::scheduler::EvictionScheduler;
use crate::timer::{TimerExecutor, TimerTask};

struct IntervalInner<K, V> {
    core: QueueCore<K, V>,
    executor: Arc<TimerExecutor>,
    interval: Duration,
    /// The periodic drain task, present while the queue has entries.
    driver: Mutex<Option<TimerTask>>,
    /// Fast-path mirror of "driver armed", re-derived under the `driver`
    /// mutex before any arming or disarming decision.
    active: AtomicBool,
}

/// An [`EvictionScheduler`] draining the eviction queue every `interval`.
///
/// Scheduling and cancelling cost one queue operation; expiry accuracy is
/// bounded by the interval. Good when writes outpace expirations.
///
/// After [`shutdown`](EvictionScheduler::shutdown) (which stops the
/// executor, shared or not) scheduling and cancellation degrade to bare
/// queue bookkeeping: nothing fires and entries expire lazily.
pub struct IntervalScheduler<K, V> {
    inner: Arc<IntervalInner<K, V>>,
}

impl<K, V> IntervalScheduler<K, V>
where
    K: Eq + std::hash::Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates the scheduler with its own executor and the default queue.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ZeroInterval`] if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self> {
        Self::with_parts(
            interval,
            Arc::new(TimerExecutor::new()),
            Box::new(DeadlineMapQueue::new()),
        )
    }

    /// Creates the scheduler on a shared executor.
    pub fn with_executor(interval: Duration, executor: Arc<TimerExecutor>) -> Result<Self> {
        Self::with_parts(interval, executor, Box::new(DeadlineMapQueue::new()))
    }

    /// Creates the scheduler over a custom eviction queue.
    pub fn with_queue(interval: Duration, queue: Box<dyn EvictionQueue<K, V>>) -> Result<Self> {
        Self::with_parts(interval, Arc::new(TimerExecutor::new()), queue)
    }

    /// Creates the scheduler from explicit parts.
    pub fn with_parts(
        interval: Duration,
        executor: Arc<TimerExecutor>,
        queue: Box<dyn EvictionQueue<K, V>>,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(Self {
            inner: Arc::new(IntervalInner {
                core: QueueCore::new(queue),
                executor,
                interval,
                driver: Mutex::new(None),
                active: AtomicBool::new(false),
            }),
        })
    }
}

impl<K: Send + Sync + 'static, V: Send + Sync + 'static> IntervalInner<K, V> {
    /// Arms the periodic task. The queue state is re-checked under the
    /// mutex: a cancel landing between the caller's check and this lock
    /// must not leave a task running over an empty queue.
    fn activate(self: &Arc<Self>) {
        let mut driver = self.driver.lock();
        let active = self.core.has_entries();
        self.active.store(active, Ordering::Release);
        if active && driver.is_none() {
            let inner = Arc::downgrade(self);
            *driver = Some(self.executor.schedule_periodic(self.interval, move || {
                if let Some(inner) = inner.upgrade() {
                    inner.tick();
                }
            }));
        }
    }

    /// Disarms the periodic task, re-checking emptiness under the mutex
    /// for the symmetric race.
    fn deactivate(&self) {
        let mut driver = self.driver.lock();
        let active = self.core.has_entries();
        self.active.store(active, Ordering::Release);
        if !active && let Some(task) = driver.take() {
            task.cancel();
        }
    }

    fn tick(&self) {
        if self.core.drain() && !self.core.has_entries() && self.active.load(Ordering::Acquire) {
            self.deactivate();
        }
    }
}

impl<K, V> EvictionScheduler<K, V> for IntervalScheduler<K, V>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn schedule_eviction(&self, entry: &Arc<TtlEntry<K, V>>, sink: &EvictionSink<K, V>) {
        if self.inner.core.schedule(entry, sink)
            && self.inner.core.has_entries()
            && !self.inner.active.load(Ordering::Acquire)
        {
            self.inner.activate();
        }
    }

    fn cancel_eviction(&self, entry: &Arc<TtlEntry<K, V>>) {
        if self.inner.core.cancel(entry)
            && !self.inner.core.has_entries()
            && self.inner.active.load(Ordering::Acquire)
        {
            self.inner.deactivate();
        }
    }

    fn shutdown(&self) {
        self.inner.executor.shutdown();
    }
}
