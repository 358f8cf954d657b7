use std::future::Future;
use std::sync::Arc;
use tokio::sync::{AcquireError, Semaphore};
use tokio::task::{JoinError, JoinHandle};

/// Bounds how many render tasks run at once.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ConcurrencyLimiter {
    /// A limit of zero is treated as one.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// One slot per logical CPU.
    pub fn per_cpu() -> Self {
        Self::new(default_concurrency())
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Stop granting slots. Waiting and later submissions fail; running tasks keep theirs.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Runs submitted futures under a [`ConcurrencyLimiter`] and hands results
/// back in submission order, whatever order they complete in.
pub struct TaskPool<T> {
    limiter: ConcurrencyLimiter,
    handles: Vec<JoinHandle<T>>,
}

impl<T: Send + 'static> TaskPool<T> {
    pub fn new(limiter: ConcurrencyLimiter) -> Self {
        Self {
            limiter,
            handles: Vec::new(),
        }
    }

    /// Wait for a free slot, then spawn `task` holding it. Slots are granted
    /// first come, first served, so tasks start in submission order.
    ///
    /// Returns the task's position. Fails without spawning once the limiter is closed.
    pub async fn submit<F>(&mut self, task: F) -> Result<usize, AcquireError>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permit = Arc::clone(&self.limiter.semaphore)
            .acquire_owned()
            .await?;

        let handle = tokio::spawn(async move {
            let _permit = permit;
            task.await
        });
        self.handles.push(handle);
        Ok(self.handles.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every task. Index `i` holds the outcome of the `i`th submission.
    pub async fn join(self) -> Vec<Result<T, JoinError>> {
        let mut results = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            results.push(handle.await);
        }
        results
    }
}
