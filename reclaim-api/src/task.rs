//! # Task Abstraction
//!
//! A task is anything a worker can run. Tasks are shared (`Arc<dyn Task>`)
//! rather than consumed: a worker keeps its installed task after a run, and
//! starting the worker again runs the same task again.

use std::fmt;
use std::sync::Arc;

use crate::errors::TaskError;

/// Result of a single task run.
pub type TaskResult = Result<(), TaskError>;

/// A unit of work executed on a worker's thread.
///
/// Returning an error and panicking are both treated as task failures by the
/// worker that runs the task; neither takes the worker down.
pub trait Task: Send + Sync {
    /// Run the task to completion.
    fn run(&self) -> TaskResult;

    /// Short label attached to the tracing span of each run.
    fn label(&self) -> &str {
        "task"
    }
}

/// Adapter turning a closure into a [`Task`].
pub struct FnTask<F> {
    label: String,
    f: F,
}

impl<F> FnTask<F>
where
    F: Fn() -> TaskResult + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self::labeled("task", f)
    }

    pub fn labeled(label: impl Into<String>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }
}

impl<F> Task for FnTask<F>
where
    F: Fn() -> TaskResult + Send + Sync,
{
    fn run(&self) -> TaskResult {
        (self.f)()
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl<F> fmt::Debug for FnTask<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTask").field("label", &self.label).finish()
    }
}

/// Wrap a closure as a shareable task.
pub fn task_fn<F>(f: F) -> Arc<dyn Task>
where
    F: Fn() -> TaskResult + Send + Sync + 'static,
{
    Arc::new(FnTask::new(f))
}
