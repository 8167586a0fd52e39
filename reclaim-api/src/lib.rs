//! # Reclaim API
//!
//! Contracts shared between the reusable worker pool and the code that feeds it
//! work. Implementations live in the `reclaim` crate; this crate only defines
//! what a task is, what an execution context provides, how lifecycle events
//! are observed and which errors can surface.
//!
//! ## Core Components
//!
//! - **Task**: a unit of work with a single `run` capability
//! - **ExecutionContext**: groups and names the threads backing a pool's workers
//! - **WorkerObserver**: hooks into worker creation, claim, reclaim and failure
//! - **Errors**: protocol violations, spawn failures and configuration problems
//!
//! ## Usage Example
//!
//! ```rust
//! use reclaim_api::{task_fn, Task};
//!
//! let task = task_fn(|| {
//!     println!("hello from a reusable worker");
//!     Ok(())
//! });
//! assert!(task.run().is_ok());
//! ```
//!
//! ## Module Organization
//!
//! - [`task`]: the task abstraction and closure adapters
//! - [`context`]: execution contexts (thread groups)
//! - [`observer`]: worker lifecycle hooks
//! - [`errors`]: error types
//! - [`types`]: identifiers and failure reports

pub mod context;
pub mod errors;
pub mod observer;
pub mod task;
pub mod types;

pub use context::ExecutionContext;
pub use errors::{ConfigError, PoolError, TaskError, WorkerError};
pub use observer::WorkerObserver;
pub use task::{task_fn, FnTask, Task, TaskResult};
pub use types::{FailureKind, TaskFailure, WorkerId};
