// Integration tests for reclaim::logging
//
// Each integration test file is its own process, so the global subscriber
// installed here does not leak into the other test files.

#[cfg(test)]
mod tests {
    use std::fs;

    use reclaim::logging::{self, LogConfig};
    use reclaim::{Pool, PoolConfig, TaskError, task_fn};

    #[test]
    fn test_worker_events_reach_log_file() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join(format!("reclaim-workers-{}.log", std::process::id()));
        let _ = fs::remove_file(&path);

        logging::init_with_file(LogConfig::default(), &path)?;
        // Later initialisation is a no-op
        logging::init_default();
        logging::init_development();

        let pool = Pool::new(PoolConfig {
            name: "logged".to_string(),
            initial_size: 0,
            maximum_size: 2,
            ..PoolConfig::default()
        })?;
        let worker = pool.acquire_named("writer");
        worker.set_task(task_fn(|| {
            logging::info!(answer = 42, "inside task");
            Err(TaskError::Failed("disk quota".to_string()))
        }));
        worker.start()?;
        worker.wait_idle();

        let contents = fs::read_to_string(&path)?;
        assert!(contents.contains("inside task"), "log was: {contents}");
        assert!(contents.contains("answer=42"));
        // The worker's own failure event, tagged with its thread name
        assert!(contents.contains("Task failed: disk quota"));
        assert!(contents.contains(&format!("logged-{}", worker.id())));

        fs::remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn test_unopenable_log_file_is_reported() {
        let path = std::env::temp_dir()
            .join(format!("reclaim-missing-{}", std::process::id()))
            .join("nested")
            .join("workers.log");

        assert!(logging::init_with_file(LogConfig::default(), &path).is_err());
        assert!(!path.exists());
    }
}
