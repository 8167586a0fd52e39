//! # Reusable Worker
//!
//! A worker owns one native thread that it launches lazily on the first
//! `start` and then parks between assignments instead of letting it exit.
//!
//! ## Lifecycle
//! 1. The pool constructs the worker; no thread exists yet.
//! 2. A caller installs a task and calls `start`. The first start launches the
//!    thread, later starts wake the parked thread.
//! 3. The thread runs the task, marks the worker idle, reports back to the
//!    pool and parks again on the run-lock's condition.
//! 4. If the pool does not keep the worker (pool full or gone), the thread
//!    exits. A later `start` on a handle that is still around launches a new
//!    one.
//!
//! ## Locking
//! The run state (`started`, `running`, `pending`, `retired`) sits behind one
//! mutex. The task itself never runs under that mutex, so `start` on a busy
//! worker fails immediately instead of blocking until the task ends. Completion
//! (clearing `running` and reporting to the pool) happens inside one critical
//! section, so once a waiter observes the worker idle, the pool already
//! treats it as reusable.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::time::{Duration, Instant};

use reclaim_api::{
    ExecutionContext, FailureKind, Task, TaskFailure, TaskResult, WorkerError, WorkerId,
};
use tracing::{Dispatch, debug, error, trace};

use super::pool::{PoolShared, Reclaimed};
use crate::sync::{lock, wait, wait_timeout};

/// Logical name given to workers that are acquired without one.
pub const DEFAULT_WORKER_NAME: &str = "reusable-worker";

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Default)]
struct RunState {
    /// A thread is alive for this worker
    started: bool,
    /// A start was accepted and its task has not finished yet
    running: bool,
    /// A start was accepted and the thread has not picked it up yet
    pending: bool,
    /// The pool let go of the worker while it sat idle
    retired: bool,
    completed: u64,
}

pub(crate) struct WorkerShared {
    id: WorkerId,
    name: Mutex<String>,
    task: Mutex<Option<Arc<dyn Task>>>,
    state: Mutex<RunState>,
    /// Signalled on `start` and on retirement; the worker thread waits here
    wake: Condvar,
    /// Signalled when a run completes; `wait_idle` callers wait here
    idle: Condvar,
    pool: Weak<PoolShared>,
    context: Arc<dyn ExecutionContext>,
    dispatch: Option<Dispatch>,
}

/// Handle to a reusable worker.
///
/// Handles are cheap to clone; clones refer to the same worker and compare
/// equal.
#[derive(Clone)]
pub struct Worker {
    shared: Arc<WorkerShared>,
}

impl Worker {
    pub(crate) fn new(
        pool: Weak<PoolShared>,
        context: Arc<dyn ExecutionContext>,
        dispatch: Option<Dispatch>,
    ) -> Self {
        let id = WorkerId::new(NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            shared: Arc::new(WorkerShared {
                id,
                name: Mutex::new(DEFAULT_WORKER_NAME.to_string()),
                task: Mutex::new(None),
                state: Mutex::new(RunState::default()),
                wake: Condvar::new(),
                idle: Condvar::new(),
                pool,
                context,
                dispatch,
            }),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.shared.id
    }

    pub fn name(&self) -> String {
        self.shared.name()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *lock(&self.shared.name) = name.into();
    }

    /// Install the task run by the next `start`.
    ///
    /// The task stays installed after it runs. Replacing it while the worker
    /// is running only affects later starts.
    pub fn set_task(&self, task: Arc<dyn Task>) {
        *lock(&self.shared.task) = Some(task);
    }

    pub fn clear_task(&self) {
        *lock(&self.shared.task) = None;
    }

    pub fn task(&self) -> Option<Arc<dyn Task>> {
        lock(&self.shared.task).clone()
    }

    /// Run the installed task on the worker's thread.
    ///
    /// Returns as soon as the assignment is handed off; the task runs
    /// concurrently with the caller.
    ///
    /// # Errors
    /// - [`WorkerError::AlreadyRunning`] if the previous run has not finished.
    ///   The running task is left alone.
    /// - [`WorkerError::SpawnFailed`] if the thread could not be launched.
    pub fn start(&self) -> Result<(), WorkerError> {
        let mut state = lock(&self.shared.state);
        if state.running {
            return Err(WorkerError::AlreadyRunning(self.shared.id));
        }
        state.running = true;
        state.pending = true;

        if state.started {
            self.shared.wake.notify_one();
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let spawned = self
            .shared
            .context
            .thread_builder(self.shared.id)
            .spawn(move || run_loop(shared));

        match spawned {
            Ok(_) => {
                state.started = true;
                Ok(())
            }
            Err(err) => {
                state.running = false;
                state.pending = false;
                error!(worker = %self.shared.id, error = %err, "failed to launch worker thread");
                Err(WorkerError::SpawnFailed {
                    worker: self.shared.id,
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Whether the worker's thread is currently alive.
    pub fn is_started(&self) -> bool {
        lock(&self.shared.state).started
    }

    /// Whether a run is in progress (accepted and not yet completed).
    pub fn is_running(&self) -> bool {
        lock(&self.shared.state).running
    }

    /// Number of runs this worker has completed, successful or not.
    pub fn completed_runs(&self) -> u64 {
        lock(&self.shared.state).completed
    }

    /// Block until the current run, if any, has completed and the worker has
    /// reported back to its pool.
    pub fn wait_idle(&self) {
        let mut state = lock(&self.shared.state);
        while state.running {
            state = wait(&self.shared.idle, state);
        }
    }

    /// Like [`wait_idle`](Self::wait_idle), giving up after `timeout`.
    /// Returns whether the worker is idle.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = lock(&self.shared.state);
        while state.running {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = wait_timeout(&self.shared.idle, state, deadline - now);
        }
        true
    }

    pub fn ptr_eq(&self, other: &Worker) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn downgrade(&self) -> Weak<WorkerShared> {
        Arc::downgrade(&self.shared)
    }

    /// Reset the worker for a new holder.
    pub(crate) fn assign(&self, task: Option<Arc<dyn Task>>, name: &str) {
        *lock(&self.shared.task) = task;
        self.set_name(name);
    }

    /// Report an idle worker back to `pool` under the run-lock.
    ///
    /// Returns `None`, leaving the books untouched, while a run is in
    /// progress. A parked thread whose worker the pool discards is retired.
    pub(crate) fn reclaim_idle(&self, pool: &PoolShared) -> Option<Reclaimed> {
        let mut state = lock(&self.shared.state);
        if state.running {
            return None;
        }
        let outcome = pool.return_worker(self);
        if outcome == Reclaimed::Discarded && state.started {
            state.retired = true;
            self.shared.wake.notify_one();
        }
        Some(outcome)
    }

    /// Let an idle, parked thread exit. Called when the owning pool is dropped.
    pub(crate) fn retire(&self) {
        let mut state = lock(&self.shared.state);
        state.retired = true;
        self.shared.wake.notify_one();
    }
}

impl WorkerShared {
    fn name(&self) -> String {
        lock(&self.name).clone()
    }

    /// Run the installed task once, isolating failures.
    ///
    /// The claim hook, the task's label and the task share one unwind
    /// boundary; a panic in any of them is reported as a failed run.
    fn execute(&self) {
        let name = self.name();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.claim_and_run(&name)));

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some((FailureKind::Errored, err.to_string())),
            Err(payload) => Some((FailureKind::Panicked, panic_message(payload.as_ref()))),
        };

        let failure = failure.map(|(kind, message)| TaskFailure {
            worker: self.id,
            worker_name: name,
            kind,
            message,
        });
        if let Some(failure) = &failure {
            error!(worker = %self.id, kind = ?failure.kind, "{}", failure);
        }
        if let Some(pool) = self.pool.upgrade() {
            pool.record_run(failure);
        }
    }

    fn claim_and_run(&self, name: &str) -> TaskResult {
        if let Some(observer) = self.pool.upgrade().and_then(|pool| pool.observer()) {
            observer.on_claim(self.id, name);
        }

        let Some(task) = lock(&self.task).clone() else {
            trace!(worker = %self.id, "started without a task");
            return Ok(());
        };

        let label = task.label();
        let span = crate::worker_span!(self.id, name, label);
        let _entered = span.enter();
        task.run()
    }
}

/// Body of the worker thread.
fn run_loop(shared: Arc<WorkerShared>) {
    let _dispatch = shared.dispatch.as_ref().map(tracing::dispatcher::set_default);
    guard_hook(shared.id, "thread_started", || shared.context.thread_started(shared.id));
    debug!(worker = %shared.id, group = shared.context.name(), "worker thread launched");

    let handle = Worker {
        shared: Arc::clone(&shared),
    };

    loop {
        let mut state = lock(&shared.state);
        while !state.pending && !state.retired {
            state = wait(&shared.wake, state);
        }
        if !state.pending {
            state.started = false;
            break;
        }
        state.pending = false;
        drop(state);

        shared.execute();

        // Upgraded before taking the run-lock and released after it, so that
        // dropping the last pool reference never happens under our own lock.
        let pool = shared.pool.upgrade();
        let mut state = lock(&shared.state);
        state.running = false;
        state.completed += 1;
        let outcome = match &pool {
            Some(pool) => pool.return_worker(&handle),
            None => Reclaimed::PoolGone,
        };
        let retained = outcome.keeps_worker();
        if !retained {
            state.started = false;
        }
        shared.idle.notify_all();
        drop(state);

        if let Some(observer) = pool.as_ref().and_then(|pool| pool.observer()) {
            guard_hook(shared.id, "on_reclaim", || observer.on_reclaim(shared.id, retained));
        }
        drop(pool);

        if !retained {
            debug!(worker = %shared.id, ?outcome, "worker not retained");
            break;
        }
    }

    guard_hook(shared.id, "thread_stopped", || shared.context.thread_stopped(shared.id));
    debug!(worker = %shared.id, "worker thread exiting");
}

/// Run an observer or context hook, containing any panic it raises.
pub(crate) fn guard_hook(worker: WorkerId, hook: &'static str, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        let message = panic_message(payload.as_ref());
        error!(worker = %worker, hook, panic = %message, "hook panicked");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    }
}

impl PartialEq for Worker {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Worker {}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared.state);
        f.debug_struct("Worker")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name())
            .field("started", &state.started)
            .field("running", &state.running)
            .field("completed", &state.completed)
            .finish()
    }
}

impl fmt::Display for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {}>", self.shared.name(), self.shared.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_string_payloads() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "Unknown panic");
    }
}
