//! Bounded async task dispatch
//!
//! `WorkerPool` caps the number of concurrently running executions with a
//! semaphore. `submit` hands back a [`TaskHandle`]: a future resolving to the
//! task's result. A handle can cancel its task as long as the task has not
//! started; cancellation after start is best-effort only and the task may
//! still run to completion.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use reginald_core::{Error, Result};
use tokio::sync::{oneshot, Semaphore};

/// Bounded pool of spawned executions
#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    /// A pool allowing at most `limit` tasks to run at once
    pub fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
        }
    }

    /// Spawn `task` once a permit is available
    pub fn submit<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let semaphore = self.semaphore.clone();

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            if flag.load(Ordering::SeqCst) {
                let _ = sender.send(Err(Error::Cancelled));
                return;
            }
            let _ = sender.send(task.await);
        });

        TaskHandle {
            receiver,
            cancelled,
        }
    }
}

/// Future resolving to a submitted task's result
pub struct TaskHandle<T> {
    receiver: oneshot::Receiver<Result<T>>,
    cancelled: Arc<AtomicBool>,
}

impl<T> TaskHandle<T> {
    /// Request cancellation; only effective before the task starts
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_delivers_result() {
        let pool = WorkerPool::new(4);
        let handle = pool.submit(async { Ok(21 * 2) });
        assert_eq!(handle.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_submit_delivers_error() {
        let pool = WorkerPool::new(4);
        let handle = pool.submit(async {
            Err::<(), _>(Error::invalid_query("boom"))
        });
        assert!(matches!(handle.await, Err(Error::InvalidQuery { .. })));
    }

    #[tokio::test]
    async fn test_limit_is_respected() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let peak = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                pool.submit(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let pool = WorkerPool::new(1);
        let (release, gate) = oneshot::channel::<()>();

        // first task holds the only permit until released
        let blocker = pool.submit(async move {
            let _ = gate.await;
            Ok(())
        });

        let handle = pool.submit(async { Ok(1) });
        handle.cancel();
        let _ = release.send(());

        blocker.await.unwrap();
        assert!(matches!(handle.await, Err(Error::Cancelled)));
    }
}
