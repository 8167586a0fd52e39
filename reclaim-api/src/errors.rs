//! # Error Types
//!
//! Errors surfaced by workers, pools, configuration and tasks.
//!
//! Two failure modes have no error type: releasing an
//! ownership flag that the caller does not own returns `false`, and a task
//! failure never propagates to the caller of `start` (it is reported through
//! the pool instead).
//!
//! ## Usage Example
//!
//! ```rust
//! use reclaim_api::errors::WorkerError;
//!
//! fn describe(error: &WorkerError) -> &'static str {
//!     match error {
//!         WorkerError::AlreadyRunning(_) => "start raced with a running task",
//!         WorkerError::SpawnFailed { .. } => "the OS refused a new thread",
//!     }
//! }
//! ```

use thiserror::Error;

use crate::types::WorkerId;

/// Errors raised by worker operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// `start` was called while the worker's task is still executing.
    ///
    /// The running task is not affected.
    #[error("Worker {0} is already running")]
    AlreadyRunning(WorkerId),

    /// The worker's thread could not be launched.
    #[error("Failed to launch thread for {worker}: {reason}")]
    SpawnFailed { worker: WorkerId, reason: String },
}

/// Errors related to pool configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Thread names may not contain NUL bytes.
    #[error("Invalid thread name: {0:?}")]
    InvalidThreadName(String),

    /// The failure report channel needs room for at least one report.
    #[error("Failure report capacity must be greater than zero")]
    ZeroFailureCapacity,
}

/// Errors raised by pool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Invalid pool configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

/// Error returned by a task run.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Task failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
