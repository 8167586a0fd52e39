use crate::types::{TaskFailure, WorkerId};

/// Hooks into the worker lifecycle of a pool.
///
/// All methods default to no-ops. `on_claim` and `on_task_failed` run on the
/// worker's own thread; `on_created` runs on the thread that acquired or
/// pre-warmed the worker. No pool or worker lock is held while a hook runs,
/// and a panicking hook never takes a worker thread down.
pub trait WorkerObserver: Send + Sync {
    /// A new worker was constructed by the pool.
    fn on_created(&self, _worker: WorkerId) {}

    /// The worker picked up an assignment and is about to run its task.
    fn on_claim(&self, _worker: WorkerId, _name: &str) {}

    /// The worker left the pool's outstanding set, either after finishing an
    /// assignment or through `Pool::reclaim`. `retained` is false when the
    /// pool did not keep it as idle.
    fn on_reclaim(&self, _worker: WorkerId, _retained: bool) {}

    /// The task returned an error or panicked.
    fn on_task_failed(&self, _failure: &TaskFailure) {}
}
