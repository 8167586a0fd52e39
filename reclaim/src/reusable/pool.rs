use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use lazy_static::lazy_static;
use reclaim_api::{
    ExecutionContext, PoolError, Task, TaskFailure, WorkerError, WorkerId, WorkerObserver,
};
use tracing::{debug, warn};

use super::worker::{DEFAULT_WORKER_NAME, Worker, WorkerShared, guard_hook};
use crate::config::PoolConfig;
use crate::group::ThreadGroup;
use crate::log_pool;
use crate::logging;
use crate::sync::lock;

lazy_static! {
    static ref GLOBAL_POOL: Pool = Pool::from_env_or_default();
}

/// Result of a worker reporting back to its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reclaimed {
    /// Moved from outstanding into the idle set
    Pooled,
    /// Left outstanding but the idle set was full
    Discarded,
    /// Already in the idle set; nothing changed
    AlreadyIdle,
    /// Neither outstanding nor idle; nothing changed
    NotOutstanding,
    /// The pool no longer exists
    PoolGone,
}

impl Reclaimed {
    /// Whether the worker's thread should park and wait for reuse.
    pub(crate) fn keeps_worker(self) -> bool {
        matches!(self, Reclaimed::Pooled | Reclaimed::AlreadyIdle)
    }
}

/// Pool-wide bookkeeping, guarded by a single lock.
#[derive(Default)]
struct Books {
    /// Reusable workers, most recently reclaimed last
    idle: Vec<Worker>,
    /// Workers handed out and not yet reclaimed
    outstanding: HashMap<WorkerId, Weak<WorkerShared>>,
    /// Workers ever constructed
    allocated: usize,
}

impl Books {
    /// Forget outstanding workers whose every handle was dropped before they
    /// ever ran.
    fn prune(&mut self) {
        self.outstanding.retain(|_, worker| worker.strong_count() > 0);
    }
}

pub(crate) struct PoolShared {
    name: String,
    maximum_size: usize,
    context: Arc<dyn ExecutionContext>,
    observer: Option<Arc<dyn WorkerObserver>>,
    dispatch: Option<tracing::Dispatch>,
    books: Mutex<Books>,
    completed: AtomicU64,
    failed: AtomicU64,
    failure_tx: flume::Sender<TaskFailure>,
    failure_rx: flume::Receiver<TaskFailure>,
}

impl PoolShared {
    pub(crate) fn observer(&self) -> Option<Arc<dyn WorkerObserver>> {
        self.observer.clone()
    }

    /// Move a finished worker from outstanding back into the idle set.
    ///
    /// Callers hold the worker's run-lock.
    pub(crate) fn return_worker(&self, worker: &Worker) -> Reclaimed {
        let mut books = lock(&self.books);
        let outcome = if books.outstanding.remove(&worker.id()).is_none() {
            if books.idle.iter().any(|idle| idle.ptr_eq(worker)) {
                Reclaimed::AlreadyIdle
            } else {
                Reclaimed::NotOutstanding
            }
        } else if books.idle.len() < self.maximum_size {
            books.idle.push(worker.clone());
            Reclaimed::Pooled
        } else {
            Reclaimed::Discarded
        };
        let idle = books.idle.len();
        drop(books);

        match outcome {
            Reclaimed::Pooled => {
                log_pool!(self.name.as_str(), "reclaim", worker = %worker.id(), idle)
            }
            Reclaimed::Discarded => {
                debug!(pool = %self.name, worker = %worker.id(), "idle set full, worker discarded")
            }
            _ => debug!(pool = %self.name, worker = %worker.id(), ?outcome, "reclaim ignored"),
        }
        outcome
    }

    /// Account for one finished run.
    pub(crate) fn record_run(&self, failure: Option<TaskFailure>) {
        self.completed.fetch_add(1, Ordering::AcqRel);
        let Some(failure) = failure else {
            return;
        };

        self.failed.fetch_add(1, Ordering::AcqRel);
        if let Some(observer) = &self.observer {
            guard_hook(failure.worker, "on_task_failed", || observer.on_task_failed(&failure));
        }
        if let Err(flume::TrySendError::Full(dropped)) = self.failure_tx.try_send(failure) {
            warn!(
                pool = %self.name,
                worker = %dropped.worker,
                "failure report channel full, report dropped"
            );
        }
    }
}

impl Drop for PoolShared {
    fn drop(&mut self) {
        let books = self.books.get_mut().unwrap_or_else(PoisonError::into_inner);
        let idle = mem::take(&mut books.idle);
        debug!(pool = %self.name, idle = idle.len(), "pool dropped, retiring idle workers");
        for worker in idle {
            worker.retire();
        }
    }
}

/// Pool of reusable workers.
///
/// The pool hands out idle workers, constructing new ones when none is idle,
/// and takes them back when they finish a run. Up to `maximum_size` idle
/// workers are kept; a worker that finishes while the idle set is full is let
/// go and its thread exits.
///
/// `Pool` is a cheap handle; clones share the same pool. When the last handle
/// is dropped, idle workers are retired and outstanding workers let their
/// threads exit once their current run completes.
///
/// # Examples
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use reclaim::{Pool, PoolConfig, task_fn};
///
/// let pool = Pool::new(PoolConfig::default()).unwrap();
/// let log = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = Arc::clone(&log);
/// let worker = pool.acquire();
/// worker.set_task(task_fn(move || {
///     sink.lock().unwrap().push("a");
///     Ok(())
/// }));
/// worker.start().unwrap();
/// worker.wait_idle();
///
/// assert_eq!(*log.lock().unwrap(), vec!["a"]);
/// assert_eq!(pool.acquire(), worker);
/// ```
#[derive(Clone)]
pub struct Pool {
    shared: Arc<PoolShared>,
}

impl Pool {
    /// Create a pool whose workers run in a fresh [`ThreadGroup`] named after
    /// the configuration.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        Self::with_observer(config, None)
    }

    pub fn with_observer(
        config: PoolConfig,
        observer: Option<Arc<dyn WorkerObserver>>,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        let context = Arc::new(Self::thread_group(&config));
        Ok(Self::build(config, context, observer))
    }

    /// Create a pool whose workers run in the caller-supplied context.
    pub fn with_context(
        config: PoolConfig,
        context: Arc<dyn ExecutionContext>,
        observer: Option<Arc<dyn WorkerObserver>>,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        Ok(Self::build(config, context, observer))
    }

    /// Process-wide pool configured from the environment, created on first
    /// use. It lives until the process exits.
    pub fn global() -> &'static Pool {
        &GLOBAL_POOL
    }

    fn from_env_or_default() -> Self {
        let mut config = PoolConfig::from_env();
        if let Err(err) = config.validate() {
            warn!(error = %err, "invalid pool configuration in environment, using defaults");
            config = PoolConfig::default();
        }
        let context = Arc::new(Self::thread_group(&config));
        Self::build(config, context, None)
    }

    fn thread_group(config: &PoolConfig) -> ThreadGroup {
        ThreadGroup::new(config.name.clone()).with_stack_size(config.stack_size)
    }

    fn build(
        config: PoolConfig,
        context: Arc<dyn ExecutionContext>,
        observer: Option<Arc<dyn WorkerObserver>>,
    ) -> Self {
        let (failure_tx, failure_rx) = flume::bounded(config.failure_report_capacity);
        let pool = Self {
            shared: Arc::new(PoolShared {
                name: config.name.clone(),
                maximum_size: config.maximum_size,
                context,
                observer,
                dispatch: logging::current_subscriber(),
                books: Mutex::new(Books::default()),
                completed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                failure_tx,
                failure_rx,
            }),
        };
        pool.prewarm(config.effective_initial_size());
        debug!(
            pool = %config.name,
            initial = config.effective_initial_size(),
            maximum = config.maximum_size,
            "pool created"
        );
        pool
    }

    fn prewarm(&self, count: usize) {
        let created: Vec<WorkerId> = {
            let mut books = lock(&self.shared.books);
            (0..count)
                .map(|_| {
                    let worker = self.construct_worker();
                    books.allocated += 1;
                    let id = worker.id();
                    books.idle.push(worker);
                    id
                })
                .collect()
        };
        self.notify_created(&created);
    }

    fn construct_worker(&self) -> Worker {
        Worker::new(
            Arc::downgrade(&self.shared),
            Arc::clone(&self.shared.context),
            self.shared.dispatch.clone(),
        )
    }

    fn notify_created(&self, created: &[WorkerId]) {
        if let Some(observer) = &self.shared.observer {
            for id in created {
                observer.on_created(*id);
            }
        }
    }

    /// Hand out an idle worker, or a new one if none is idle.
    ///
    /// The worker comes back with no task installed and the default name.
    pub fn acquire(&self) -> Worker {
        self.acquire_inner(None, DEFAULT_WORKER_NAME)
    }

    pub fn acquire_named(&self, name: &str) -> Worker {
        self.acquire_inner(None, name)
    }

    /// Hand out a worker with `task` already installed.
    pub fn acquire_with(&self, task: Arc<dyn Task>, name: &str) -> Worker {
        self.acquire_inner(Some(task), name)
    }

    fn acquire_inner(&self, task: Option<Arc<dyn Task>>, name: &str) -> Worker {
        let (worker, created, idle) = {
            let mut books = lock(&self.shared.books);
            books.prune();
            let (worker, created) = match books.idle.pop() {
                Some(worker) => (worker, false),
                None => {
                    books.allocated += 1;
                    (self.construct_worker(), true)
                }
            };
            books.outstanding.insert(worker.id(), worker.downgrade());
            (worker, created, books.idle.len())
        };

        if created {
            self.notify_created(&[worker.id()]);
        }
        worker.assign(task, name);
        log_pool!(self.shared.name.as_str(), "acquire", worker = %worker.id(), created, idle);
        worker
    }

    /// Acquire a worker, install `task` and start it.
    ///
    /// If the start fails the worker goes straight back to the pool.
    pub fn execute(&self, task: Arc<dyn Task>) -> Result<Worker, PoolError> {
        let worker = self.acquire_with(task, DEFAULT_WORKER_NAME);
        if let Err(err) = worker.start() {
            if matches!(err, WorkerError::SpawnFailed { .. }) {
                self.reclaim(&worker);
            }
            return Err(err.into());
        }
        Ok(worker)
    }

    /// Return an outstanding, idle worker to the idle set.
    ///
    /// Workers do this on their own when a run completes. Returns whether the
    /// worker moved into the idle set. A worker that is not outstanding, or
    /// whose run has not finished yet, is left untouched.
    pub fn reclaim(&self, worker: &Worker) -> bool {
        let Some(outcome) = worker.reclaim_idle(&self.shared) else {
            debug!(
                pool = %self.shared.name,
                worker = %worker.id(),
                "worker still running, reclaim ignored"
            );
            return false;
        };
        let changed = matches!(outcome, Reclaimed::Pooled | Reclaimed::Discarded);
        if let Some(observer) = self.shared.observer.as_ref().filter(|_| changed) {
            observer.on_reclaim(worker.id(), outcome == Reclaimed::Pooled);
        }
        outcome == Reclaimed::Pooled
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn context(&self) -> &Arc<dyn ExecutionContext> {
        &self.shared.context
    }

    pub fn maximum_size(&self) -> usize {
        self.shared.maximum_size
    }

    /// Workers currently idle and ready for reuse.
    pub fn idle_count(&self) -> usize {
        lock(&self.shared.books).idle.len()
    }

    /// Workers handed out and not yet reclaimed.
    pub fn outstanding_count(&self) -> usize {
        let mut books = lock(&self.shared.books);
        books.prune();
        books.outstanding.len()
    }

    /// Whether `worker` is currently outstanding from this pool.
    pub fn is_outstanding(&self, worker: &Worker) -> bool {
        lock(&self.shared.books).outstanding.contains_key(&worker.id())
    }

    /// Workers constructed over the pool's lifetime. Can exceed
    /// `maximum_size`, since workers beyond it are created on demand and not
    /// kept.
    pub fn allocated_workers(&self) -> usize {
        lock(&self.shared.books).allocated
    }

    /// Runs finished by this pool's workers, successful or not.
    pub fn completed_tasks(&self) -> u64 {
        self.shared.completed.load(Ordering::Acquire)
    }

    pub fn failed_tasks(&self) -> u64 {
        self.shared.failed.load(Ordering::Acquire)
    }

    /// Receiver of task failure reports.
    ///
    /// All receivers share one bounded queue: each report goes to exactly one
    /// receiver, and reports are dropped while the queue is full.
    pub fn failure_reports(&self) -> flume::Receiver<TaskFailure> {
        self.shared.failure_rx.clone()
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let books = lock(&self.shared.books);
        f.debug_struct("Pool")
            .field("name", &self.shared.name)
            .field("maximum_size", &self.shared.maximum_size)
            .field("idle", &books.idle.len())
            .field("outstanding", &books.outstanding.len())
            .field("allocated", &books.allocated)
            .finish()
    }
}
