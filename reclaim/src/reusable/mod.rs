//! # Reusable Workers
//!
//! A [`Pool`] hands out [`Worker`]s, each backed by one long-lived thread
//! that is parked between tasks instead of being torn down. Callers install
//! a task, start the worker, and the worker returns itself to the pool when
//! the task completes.
//!
//! ## Key Concepts
//! - Lazy threads: a worker's thread launches on its first start
//! - Reclaim: a finished worker reports back and becomes idle again
//! - Bounded retention: at most `maximum_size` idle workers are kept
//! - Failure isolation: an erroring or panicking task does not take its
//!   worker down; the failure is counted and reported by the pool

mod pool;
mod worker;

pub use pool::Pool;
pub use worker::{DEFAULT_WORKER_NAME, Worker};
