use std::fmt;

/// Process-unique identity of a worker.
///
/// Two worker handles refer to the same worker exactly when their ids are
/// equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// How a task run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The task returned an error.
    Errored,
    /// The task panicked.
    Panicked,
}

/// Report of a failed task run, published by the pool that owns the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Worker that ran the task
    pub worker: WorkerId,
    /// Logical name the worker carried during the run
    pub worker_name: String,
    /// Error result or panic
    pub kind: FailureKind,
    /// Error display text or panic payload
    pub message: String,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            FailureKind::Errored => "failed",
            FailureKind::Panicked => "panicked",
        };
        write!(
            f,
            "task on {} ({}) {}: {}",
            self.worker_name, self.worker, verb, self.message
        )
    }
}
