//! # Thread Group
//!
//! Default [`ExecutionContext`]: a named group that launches, names and
//! counts the threads of a pool's workers.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;

use reclaim_api::{ExecutionContext, WorkerId};
use uuid::Uuid;

/// Named group of worker threads.
///
/// Thread names take the form `"{group}-worker-{n}"`, so every thread of a
/// pool shows up under the group's name in thread dumps. Two groups may share
/// a name; [`ThreadGroup::id`] tells them apart.
#[derive(Debug)]
pub struct ThreadGroup {
    id: Uuid,
    name: String,
    stack_size: Option<usize>,
    active: AtomicUsize,
    started: AtomicU64,
}

impl ThreadGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            stack_size: None,
            active: AtomicUsize::new(0),
            started: AtomicU64::new(0),
        }
    }

    pub fn with_stack_size(mut self, stack_size: Option<usize>) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stack_size(&self) -> Option<usize> {
        self.stack_size
    }

    /// Threads of this group currently alive.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Threads this group has ever launched.
    pub fn total_started(&self) -> u64 {
        self.started.load(Ordering::Acquire)
    }
}

impl ExecutionContext for ThreadGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn thread_builder(&self, worker: WorkerId) -> thread::Builder {
        let builder = thread::Builder::new().name(format!("{}-{}", self.name, worker));
        match self.stack_size {
            Some(size) => builder.stack_size(size),
            None => builder,
        }
    }

    fn thread_started(&self, _worker: WorkerId) {
        self.started.fetch_add(1, Ordering::AcqRel);
        self.active.fetch_add(1, Ordering::AcqRel);
    }

    fn thread_stopped(&self, _worker: WorkerId) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}
