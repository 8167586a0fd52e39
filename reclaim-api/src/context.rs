//! # Execution Context
//!
//! An execution context groups the threads that back a pool's workers, so
//! that thread dumps and monitoring can attribute them to the pool. Every
//! worker created by a pool shares the pool's context.

use std::fmt;
use std::thread;

use crate::types::WorkerId;

/// Groups, names and counts worker threads.
pub trait ExecutionContext: fmt::Debug + Send + Sync {
    /// Name of the group; used as the prefix of thread names.
    fn name(&self) -> &str;

    /// Builder used to launch the thread of the given worker.
    fn thread_builder(&self, worker: WorkerId) -> thread::Builder {
        thread::Builder::new().name(format!("{}-{}", self.name(), worker))
    }

    /// Called on the worker thread right after it starts.
    fn thread_started(&self, _worker: WorkerId) {}

    /// Called on the worker thread right before it exits.
    fn thread_stopped(&self, _worker: WorkerId) {}
}
