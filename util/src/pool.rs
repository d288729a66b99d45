//! Bounded worker pool for fire-and-await background jobs.
//!
//! Capacity is enforced with a semaphore; a job only starts once it holds a permit,
//! and scheduling gives up after a configurable wait.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("worker pool saturated")]
    Saturated,
    #[error("worker pool closed")]
    Closed,
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
    schedule_timeout: Duration,
}

impl WorkerPool {
    pub fn new(size: usize, schedule_timeout: Duration) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
            schedule_timeout,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of idle workers right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` on a worker once one frees up.
    ///
    /// Waits at most `schedule_timeout` for a free worker. The permit is held until
    /// the job finishes, even if the job panics.
    pub async fn schedule<F>(&self, job: F) -> Result<JoinHandle<()>, ScheduleError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let acquire = self.permits.clone().acquire_owned();
        let permit = match tokio::time::timeout(self.schedule_timeout, acquire).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(ScheduleError::Closed),
            Err(_) => return Err(ScheduleError::Saturated),
        };

        Ok(tokio::spawn(async move {
            let _permit = permit;
            job.await;
        }))
    }

    /// Stop accepting jobs. Jobs already running finish normally.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn runs_scheduled_jobs() {
        let pool = WorkerPool::new(2, Duration::from_millis(50));
        let hits = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let hits = hits.clone();
            handles.push(
                pool.schedule(async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                })
                .await
                .expect("schedule"),
            );
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(hits.load(Ordering::SeqCst), 4);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn saturated_pool_times_out() {
        let pool = WorkerPool::new(1, Duration::from_millis(20));
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let busy = pool
            .schedule(async move {
                let _ = release_rx.await;
            })
            .await
            .expect("first job");

        let err = pool.schedule(async {}).await.unwrap_err();
        assert_eq!(err, ScheduleError::Saturated);

        release_tx.send(()).unwrap();
        busy.await.unwrap();
        assert!(pool.schedule(async {}).await.is_ok());
    }

    #[tokio::test]
    async fn closed_pool_rejects() {
        let pool = WorkerPool::new(1, Duration::from_millis(20));
        pool.close();
        assert!(pool.is_closed());
        assert_eq!(pool.schedule(async {}).await.unwrap_err(), ScheduleError::Closed);
    }

    #[tokio::test]
    async fn panicking_job_releases_its_worker() {
        let pool = WorkerPool::new(1, Duration::from_millis(50));
        let h = pool.schedule(async { panic!("boom") }).await.unwrap();
        assert!(h.await.unwrap_err().is_panic());
        assert_eq!(pool.available(), 1);
    }
}
