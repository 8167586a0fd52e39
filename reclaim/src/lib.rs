// Reclaim: recyclable worker threads
//
// A small pool of reusable workers, each owning a persistent native thread
// that is parked between tasks, plus a reentrant thread-keyed ownership flag.
// Contracts (tasks, execution contexts, observers, errors) come from the
// `reclaim-api` crate and are re-exported here.

pub mod config;
pub mod group;
pub mod logging;
pub mod reusable;
pub mod sync;

// Re-export commonly used types
pub use config::PoolConfig;
pub use group::ThreadGroup;
pub use reusable::{Pool, Worker};
pub use sync::{OwnershipFlag, OwnershipGuard};

pub use reclaim_api::{
    ConfigError, ExecutionContext, FailureKind, FnTask, PoolError, Task, TaskError, TaskFailure,
    TaskResult, WorkerError, WorkerId, WorkerObserver, task_fn,
};
