//! Timer Executor Module
//!
//! A small scheduled-task executor: one worker thread draining a
//! deadline-ordered job queue. Schedulers use it to run one-shot tasks at
//! an absolute instant and fixed-delay periodic tasks, and a single
//! executor may be shared by several schedulers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

enum JobKind {
    Once(Box<dyn FnOnce() + Send>),
    Periodic {
        period: Duration,
        run: Box<dyn Fn() + Send>,
    },
}

/// State shared between a queued job and its [`TimerTask`] handle.
struct JobShared {
    cancelled: AtomicBool,
    /// Current queue key of the job; periodic jobs move forward on re-arm.
    fire_at: Mutex<Instant>,
}

struct Job {
    shared: Arc<JobShared>,
    kind: JobKind,
}

struct ExecState {
    /// Jobs ordered by `(fire_at, id)`; the id breaks deadline ties.
    queue: BTreeMap<(Instant, u64), Job>,
    next_id: u64,
}

struct ExecInner {
    state: Mutex<ExecState>,
    wakeup: Condvar,
    finished: AtomicBool,
}

/// Cancellation handle for a task submitted to a [`TimerExecutor`].
pub struct TimerTask {
    id: u64,
    shared: Arc<JobShared>,
    exec: Weak<ExecInner>,
}

impl TimerTask {
    /// Cancels the task. A task that already ran (or is running) is
    /// unaffected beyond never being re-armed; cancelling twice is fine.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Release);
        if let Some(exec) = self.exec.upgrade() {
            let fire_at = *self.shared.fire_at.lock();
            exec.state.lock().queue.remove(&(fire_at, self.id));
        }
    }

    /// Whether `cancel` has been called on this task.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }
}

/// A shared scheduled-task executor backed by one worker thread.
///
/// Dropping the last reference shuts the worker down; [`shutdown`] does the
/// same explicitly and is idempotent. After shutdown, submissions are
/// ignored (the returned task is born cancelled) and pending jobs are
/// discarded without running.
///
/// [`shutdown`]: TimerExecutor::shutdown
pub struct TimerExecutor {
    inner: Arc<ExecInner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for TimerExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerExecutor {
    /// Creates the executor and starts its worker thread.
    pub fn new() -> Self {
        let inner = Arc::new(ExecInner {
            state: Mutex::new(ExecState {
                queue: BTreeMap::new(),
                next_id: 0,
            }),
            wakeup: Condvar::new(),
            finished: AtomicBool::new(false),
        });
        let worker_inner = Arc::clone(&inner);
        let worker = std::thread::spawn(move || worker_inner.run());
        Self {
            inner,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Runs `run` once at (or as soon as possible after) `at`.
    pub fn schedule_at(&self, at: Instant, run: impl FnOnce() + Send + 'static) -> TimerTask {
        self.submit(at, JobKind::Once(Box::new(run)))
    }

    /// Runs `run` every `period`, measured from the end of one run to the
    /// start of the next. The first run happens one period from now.
    pub fn schedule_periodic(
        &self,
        period: Duration,
        run: impl Fn() + Send + 'static,
    ) -> TimerTask {
        let kind = JobKind::Periodic {
            period,
            run: Box::new(run),
        };
        self.submit(Instant::now() + period, kind)
    }

    fn submit(&self, at: Instant, kind: JobKind) -> TimerTask {
        let shared = Arc::new(JobShared {
            cancelled: AtomicBool::new(false),
            fire_at: Mutex::new(at),
        });
        if self.inner.finished.load(Ordering::Acquire) {
            warn!("timer executor is shut down, dropping submitted task");
            shared.cancelled.store(true, Ordering::Release);
            return TimerTask {
                id: 0,
                shared,
                exec: Weak::new(),
            };
        }
        let id = {
            let mut state = self.inner.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.queue.insert(
                (at, id),
                Job {
                    shared: Arc::clone(&shared),
                    kind,
                },
            );
            id
        };
        self.inner.wakeup.notify_all();
        TimerTask {
            id,
            shared,
            exec: Arc::downgrade(&self.inner),
        }
    }

    /// Stops the worker thread. Pending jobs are cancelled, not drained.
    pub fn shutdown(&self) {
        self.inner.finished.store(true, Ordering::Release);
        self.inner.state.lock().queue.clear();
        self.inner.wakeup.notify_all();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }
}

impl Drop for TimerExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl ExecInner {
    fn run(&self) {
        debug!("timer executor worker started");
        let mut state = self.state.lock();
        loop {
            if self.finished.load(Ordering::Acquire) {
                break;
            }
            match state.queue.first_key_value().map(|(key, _)| *key) {
                None => {
                    self.wakeup.wait(&mut state);
                }
                Some((at, _)) if Instant::now() < at => {
                    self.wakeup.wait_until(&mut state, at);
                }
                Some(key) => {
                    if let Some(job) = state.queue.remove(&key) {
                        // Jobs run without the state lock so they may submit
                        // new work through the executor.
                        drop(state);
                        self.run_job(key.1, job);
                        state = self.state.lock();
                    }
                }
            }
        }
        debug!("timer executor worker stopped");
    }

    fn run_job(&self, id: u64, job: Job) {
        let Job { shared, kind } = job;
        if shared.cancelled.load(Ordering::Acquire) {
            return;
        }
        match kind {
            JobKind::Once(run) => run(),
            JobKind::Periodic { period, run } => {
                run();
                if shared.cancelled.load(Ordering::Acquire)
                    || self.finished.load(Ordering::Acquire)
                {
                    return;
                }
                let at = Instant::now() + period;
                *shared.fire_at.lock() = at;
                self.state.lock().queue.insert(
                    (at, id),
                    Job {
                        shared,
                        kind: JobKind::Periodic { period, run },
                    },
                );
                // The worker recomputes its wait from the queue head on the
                // next loop iteration, so no wakeup is needed here.
            }
        }
    }
}
