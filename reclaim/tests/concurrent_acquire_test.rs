// Concurrency tests for reclaim::Pool, driven from tokio's blocking pool

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    use futures::future::join_all;
    use reclaim::{Pool, PoolConfig, Worker, task_fn};

    fn config(initial: usize, maximum: usize) -> PoolConfig {
        PoolConfig {
            name: "concurrent".to_string(),
            initial_size: initial,
            maximum_size: maximum,
            ..PoolConfig::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquires_hand_out_distinct_workers() {
        const CALLERS: usize = 16;
        let pool = Pool::new(config(4, 32)).unwrap();
        let barrier = Arc::new(Barrier::new(CALLERS));

        let handles = (0..CALLERS).map(|_| {
            let pool = pool.clone();
            let barrier = Arc::clone(&barrier);
            tokio::task::spawn_blocking(move || {
                barrier.wait();
                pool.acquire()
            })
        });
        let workers: Vec<Worker> = join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let ids: HashSet<_> = workers.iter().map(Worker::id).collect();
        assert_eq!(ids.len(), CALLERS);
        assert_eq!(pool.outstanding_count(), CALLERS);
        assert_eq!(pool.idle_count(), 0);
        // 4 prewarmed plus 12 constructed on demand
        assert_eq!(pool.allocated_workers(), CALLERS);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_runs_all_complete_and_fill_idle_set() {
        const TASKS: usize = 24;
        let pool = Pool::new(config(2, 8)).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let handles = (0..TASKS).map(|_| {
            let pool = pool.clone();
            let counter = Arc::clone(&counter);
            tokio::task::spawn_blocking(move || {
                let worker = pool.acquire();
                worker.set_task(task_fn(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }));
                worker.start().unwrap();
                worker.wait_idle();
            })
        });
        for joined in join_all(handles).await {
            joined.unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), TASKS);
        assert_eq!(pool.completed_tasks(), TASKS as u64);
        assert_eq!(pool.outstanding_count(), 0);
        assert!(pool.idle_count() <= pool.maximum_size());
        assert!(pool.idle_count() >= 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_execute_reuses_returned_workers() {
        let pool = Pool::new(config(0, 4)).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let handles = (0..4).map(|_| {
                let pool = pool.clone();
                let counter = Arc::clone(&counter);
                tokio::task::spawn_blocking(move || {
                    let worker = pool
                        .execute(task_fn(move || {
                            counter.fetch_add(1, Ordering::SeqCst);
                            Ok(())
                        }))
                        .unwrap();
                    worker.wait_idle();
                })
            });
            for joined in join_all(handles).await {
                joined.unwrap();
            }
        }

        assert_eq!(counter.load(Ordering::SeqCst), 40);
        // Every round returns its workers before the next one starts
        assert!(pool.allocated_workers() <= 4);
        assert_eq!(pool.idle_count(), pool.allocated_workers());
    }
}
