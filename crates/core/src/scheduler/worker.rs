//! Dedicated-thread scheduler. One owned worker waits on a condition
//! variable until the earliest deadline, drains, and waits again; schedule
//! and cancel wake it only when the earliest deadline actually moved. Same
//! timing behavior as the single-task variant without going through a
//! timer executor, which makes it the cheapest on the write path.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use tracing::{info, trace};

use crate::map::entry::TtlEntry;
use crate::map::EvictionSink;
use crate::queue::{DeadlineMapQueue, EvictionQueue};
use crate::scheduler::queue_core::QueueCore;
use crate::scheduler::EvictionScheduler;

struct WorkerState {
    finished: bool,
    /// Set by schedule/cancel when the earliest deadline moved, so the
    /// worker can tell a re-plan wakeup from a spurious one.
    notified: bool,
    /// The deadline the worker is currently waiting for.
    next: Option<Instant>,
}

struct WorkerInner<K, V> {
    core: QueueCore<K, V>,
    state: Mutex<WorkerState>,
    wakeup: Condvar,
}

impl<K, V> WorkerInner<K, V> {
    fn run(&self) {
        info!("eviction worker started");
        loop {
            {
                let mut state = self.state.lock();
                loop {
                    if state.finished {
                        info!("eviction worker stopped");
                        return;
                    }
                    state.next = self.core.next_deadline();
                    match state.next {
                        Some(deadline) => {
                            if Instant::now() >= deadline {
                                break;
                            }
                            state.notified = false;
                            if self.wakeup.wait_until(&mut state, deadline).timed_out() {
                                break;
                            }
                            trace!(notified = state.notified, "eviction worker woken early");
                        }
                        None => {
                            state.notified = false;
                            self.wakeup.wait(&mut state);
                        }
                    }
                }
            }
            // Drain outside the state lock so schedule/cancel stay
            // non-blocking while evictions run.
            self.core.drain();
        }
    }
}

/// An [`EvictionScheduler`] owning a single eviction thread.
///
/// [`shutdown`](EvictionScheduler::shutdown) (or dropping the scheduler)
/// signals the thread and joins it; afterwards schedule and cancel degrade
/// to bare queue bookkeeping and entries expire lazily.
pub struct WorkerThreadScheduler<K, V> {
    inner: Arc<WorkerInner<K, V>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> Default for WorkerThreadScheduler<K, V>
where
    K: Eq + std::hash::Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> WorkerThreadScheduler<K, V>
where
    K: Eq + std::hash::Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates the scheduler with the default queue and starts its worker.
    pub fn new() -> Self {
        Self::with_queue(Box::new(DeadlineMapQueue::new()))
    }

    /// Creates the scheduler over a custom eviction queue and starts its
    /// worker.
    pub fn with_queue(queue: Box<dyn EvictionQueue<K, V>>) -> Self {
        let inner = Arc::new(WorkerInner {
            core: QueueCore::new(queue),
            state: Mutex::new(WorkerState {
                finished: false,
                notified: false,
                next: None,
            }),
            wakeup: Condvar::new(),
        });
        let worker_inner = Arc::clone(&inner);
        let worker = std::thread::spawn(move || worker_inner.run());
        Self {
            inner,
            worker: Mutex::new(Some(worker)),
        }
    }
}

impl<K, V> WorkerThreadScheduler<K, V> {
    fn notify_if_deadline_moved(&self) {
        let mut state = self.inner.state.lock();
        if self.inner.core.next_deadline() != state.next {
            state.notified = true;
            self.wakeup_worker();
        }
    }

    fn wakeup_worker(&self) {
        self.inner.wakeup.notify_all();
    }

    fn shutdown_worker(&self) {
        {
            let mut state = self.inner.state.lock();
            state.finished = true;
            state.notified = true;
        }
        self.wakeup_worker();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }
}

impl<K, V> EvictionScheduler<K, V> for WorkerThreadScheduler<K, V> {
    fn schedule_eviction(&self, entry: &Arc<TtlEntry<K, V>>, sink: &EvictionSink<K, V>) {
        if self.inner.core.schedule(entry, sink) {
            self.notify_if_deadline_moved();
        }
    }

    fn cancel_eviction(&self, entry: &Arc<TtlEntry<K, V>>) {
        if self.inner.core.cancel(entry) {
            self.notify_if_deadline_moved();
        }
    }

    fn shutdown(&self) {
        self.shutdown_worker();
    }
}

impl<K, V> Drop for WorkerThreadScheduler<K, V> {
    fn drop(&mut self) {
        self.shutdown_worker();
    }
}
