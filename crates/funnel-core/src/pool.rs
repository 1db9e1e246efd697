//! Bounded worker pool for fetch tasks.
//!
//! Every submitted task is spawned right away but must acquire one of
//! `max_workers` permits before it runs, so excess submissions queue on the
//! semaphore in submission order. Shutting the pool down refuses further
//! submissions and waits for the tracked tasks to wind down.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::error::AppError;

/// Default number of concurrent fetches.
pub const DEFAULT_MAX_WORKERS: usize = 8;

#[derive(Debug)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    max_workers: usize,
}

impl WorkerPool {
    /// Create a pool running at most `max_workers` tasks at once (minimum 1).
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_workers)),
            tracker: TaskTracker::new(),
            max_workers,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn is_shut_down(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Queue a task. It starts once a worker permit is free.
    pub fn submit<Fut, T>(&self, task: Fut) -> Result<JoinHandle<Result<T, AppError>>, AppError>
    where
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
        T: Send + 'static,
    {
        if self.is_shut_down() {
            return Err(AppError::PoolShutDown);
        }

        let permits = Arc::clone(&self.permits);
        Ok(self.tracker.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| AppError::PoolShutDown)?;
            task.await
        }))
    }

    /// Refuse new submissions and wait for every tracked task to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        tracing::debug!(max_workers = self.max_workers, "Worker pool shut down");
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}
