use reclaim_api::errors::{ConfigError, PoolError, TaskError, WorkerError};
use reclaim_api::WorkerId;
use std::error::Error;

#[cfg(test)]
mod tests {
    use super::*;

    // Test already running error
    #[test]
    fn test_already_running_error() {
        let error = WorkerError::AlreadyRunning(WorkerId::new(7));

        assert_eq!(error.to_string(), "Worker worker-7 is already running");
        assert!(error.source().is_none());
    }

    #[test]
    fn test_spawn_failed_error() {
        let error = WorkerError::SpawnFailed {
            worker: WorkerId::new(3),
            reason: "Resource temporarily unavailable".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Failed to launch thread for worker-3: Resource temporarily unavailable"
        );
    }

    #[test]
    fn test_config_errors() {
        assert_eq!(
            ConfigError::InvalidThreadName("a\0b".to_string()).to_string(),
            "Invalid thread name: \"a\\0b\""
        );
        assert_eq!(
            ConfigError::ZeroFailureCapacity.to_string(),
            "Failure report capacity must be greater than zero"
        );
    }

    // Test conversion into PoolError
    #[test]
    fn test_pool_error_from_worker_error() {
        let error: PoolError = WorkerError::AlreadyRunning(WorkerId::new(1)).into();

        assert!(matches!(error, PoolError::Worker(WorkerError::AlreadyRunning(_))));
        assert_eq!(error.to_string(), "Worker error: Worker worker-1 is already running");
        assert!(error.source().is_some());
    }

    #[test]
    fn test_pool_error_from_config_error() {
        let error: PoolError = ConfigError::ZeroFailureCapacity.into();

        assert_eq!(
            error.to_string(),
            "Invalid pool configuration: Failure report capacity must be greater than zero"
        );
    }

    #[test]
    fn test_task_error_display() {
        let failed = TaskError::Failed("boom".to_string());
        assert_eq!(failed.to_string(), "Task failed: boom");

        let other: TaskError = anyhow::anyhow!("connection reset").into();
        assert_eq!(other.to_string(), "connection reset");
    }

    #[test]
    fn test_worker_error_equality() {
        let id = WorkerId::new(9);
        assert_eq!(WorkerError::AlreadyRunning(id), WorkerError::AlreadyRunning(id));
        assert_ne!(
            WorkerError::AlreadyRunning(id),
            WorkerError::AlreadyRunning(WorkerId::new(10))
        );
    }
}
