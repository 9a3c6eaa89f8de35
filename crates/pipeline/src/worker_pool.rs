//! Fixed-capacity task gate with an unbounded backlog.
//!
//! Submission never blocks and never rejects: every task is spawned
//! immediately and parks on the semaphore until a slot frees up. At most
//! `max_concurrent` photos are processing at any instant, the rest wait
//! their turn (tokio semaphores are fair, so permits are granted in the
//! order tasks reach the gate).

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Concurrency gate shared by every pipeline task.
///
/// Clone-cheap handles are not needed; wrap it in `Arc` and share.
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    queued: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Create a pool running at most `max_concurrent` tasks at once.
    /// A capacity of zero is treated as one.
    pub fn new(max_concurrent: usize) -> Self {
        let capacity = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            max_concurrent: capacity,
            queued: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Register a task and return immediately.
    ///
    /// The task starts once a permit frees up. An `Err` outcome is
    /// logged at `warn` with the task's label; a panic is contained by
    /// the task boundary and logged at `error`. Either way the permit is
    /// released and the next queued task starts, so pool capacity never
    /// leaks.
    pub fn spawn<F, E>(&self, label: String, task: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        self.queued.fetch_add(1, Ordering::SeqCst);
        let permits = self.permits.clone();
        let queued = self.queued.clone();

        tokio::spawn(async move {
            let permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                // Closed semaphore means the process is going away.
                Err(_) => {
                    queued.fetch_sub(1, Ordering::SeqCst);
                    return;
                }
            };
            queued.fetch_sub(1, Ordering::SeqCst);

            match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::warn!(task = %label, error = %error, "pipeline task failed");
                }
                Err(_) => {
                    tracing::error!(task = %label, "pipeline task panicked");
                }
            }

            drop(permit);
        })
    }

    /// Tasks currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    /// Tasks submitted but still waiting for a permit.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.max_concurrent
    }
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------
