//! Single-task scheduler armed at the next deadline. At most one one-shot
//! task is outstanding at any time; every schedule or cancel that changes
//! the earliest deadline re-arms it, and a fired task re-arms for whatever
//! became earliest. Fires exactly when something is due, with a higher
//! per-operation cost than the fixed-interval variant.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::map::entry::TtlEntry;
use crate::map::EvictionSink;
use crate::queue::{DeadlineMapQueue, EvictionQueue};
use crate::scheduler::queue_core::QueueCore;
use crate::scheduler::EvictionScheduler;
use crate::timer::{TimerExecutor, TimerTask};

#[derive(Default)]
struct Armed {
    task: Option<TimerTask>,
    /// The deadline the outstanding task targets; compared against the
    /// queue head to decide whether re-arming is needed.
    next: Option<Instant>,
}

struct DeadlineInner<K, V> {
    core: QueueCore<K, V>,
    executor: Arc<TimerExecutor>,
    armed: Mutex<Armed>,
}

/// An [`EvictionScheduler`] keeping a single one-shot task targeted at the
/// earliest pending deadline.
///
/// After [`shutdown`](EvictionScheduler::shutdown) (which stops the
/// executor, shared or not) nothing fires and entries expire lazily.
pub struct DeadlineScheduler<K, V> {
    inner: Arc<DeadlineInner<K, V>>,
}

impl<K, V> Default for DeadlineScheduler<K, V>
where
    K: Eq + std::hash::Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> DeadlineScheduler<K, V>
where
    K: Eq + std::hash::Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates the scheduler with its own executor and the default queue.
    pub fn new() -> Self {
        Self::with_parts(Arc::new(TimerExecutor::new()), Box::new(DeadlineMapQueue::new()))
    }

    /// Creates the scheduler on a shared executor.
    pub fn with_executor(executor: Arc<TimerExecutor>) -> Self {
        Self::with_parts(executor, Box::new(DeadlineMapQueue::new()))
    }

    /// Creates the scheduler over a custom eviction queue.
    pub fn with_queue(queue: Box<dyn EvictionQueue<K, V>>) -> Self {
        Self::with_parts(Arc::new(TimerExecutor::new()), queue)
    }

    /// Creates the scheduler from explicit parts.
    pub fn with_parts(
        executor: Arc<TimerExecutor>,
        queue: Box<dyn EvictionQueue<K, V>>,
    ) -> Self {
        Self {
            inner: Arc::new(DeadlineInner {
                core: QueueCore::new(queue),
                executor,
                armed: Mutex::new(Armed::default()),
            }),
        }
    }
}

impl<K: Send + Sync + 'static, V: Send + Sync + 'static> DeadlineInner<K, V> {
    /// Re-arms the task if the earliest deadline moved. The comparison and
    /// the swap happen under one lock so two concurrent re-syncs cannot
    /// leave two tasks outstanding.
    fn resync(self: &Arc<Self>) {
        let mut armed = self.armed.lock();
        if self.core.next_deadline() == armed.next {
            return;
        }
        if let Some(task) = armed.task.take() {
            task.cancel();
        }
        self.arm(&mut armed);
    }

    fn arm(self: &Arc<Self>, armed: &mut Armed) {
        armed.next = self.core.next_deadline();
        armed.task = armed.next.map(|at| {
            let inner = Arc::downgrade(self);
            self.executor.schedule_at(at, move || {
                if let Some(inner) = inner.upgrade() {
                    inner.fire();
                }
            })
        });
    }

    /// Drains and re-arms unconditionally: even a drain that observed
    /// nothing due (a cancel won the race for the head) leaves a task
    /// targeting the new earliest deadline, so no expiry can stall.
    fn fire(self: &Arc<Self>) {
        self.core.drain();
        let mut armed = self.armed.lock();
        if let Some(task) = armed.task.take() {
            task.cancel();
        }
        self.arm(&mut armed);
    }
}

impl<K, V> EvictionScheduler<K, V> for DeadlineScheduler<K, V>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn schedule_eviction(&self, entry: &Arc<TtlEntry<K, V>>, sink: &EvictionSink<K, V>) {
        if self.inner.core.schedule(entry, sink) {
            self.inner.resync();
        }
    }

    fn cancel_eviction(&self, entry: &Arc<TtlEntry<K, V>>) {
        if self.inner.core.cancel(entry) {
            self.inner.resync();
        }
    }

    fn shutdown(&self) {
        self.inner.executor.shutdown();
    }
}
