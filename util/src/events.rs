//! In-process event bus with asynchronous fan-out.
//!
//! Handlers subscribe to an event kind and receive a shared payload. `publish` runs
//! every current handler on the [`WorkerPool`] and returns once all of them finished.
//! A handler that fails to schedule or panics is logged and does not affect the others.

use crate::pool::WorkerPool;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};

type Handler<P> = Arc<dyn Fn(Arc<P>) -> BoxFuture<'static, ()> + Send + Sync>;

pub struct EventBus<K, P> {
    handlers: RwLock<HashMap<K, Vec<Handler<P>>>>,
    pool: WorkerPool,
}

impl<K, P> EventBus<K, P>
where
    K: Eq + Hash + Copy + Debug + Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    pub fn new(pool: WorkerPool) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            pool,
        }
    }

    /// Register `handler` for `kind`. Handlers for the same kind run concurrently.
    pub fn subscribe<F, Fut>(&self, kind: K, handler: F)
    where
        F: Fn(Arc<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let boxed: Handler<P> = Arc::new(move |payload| Box::pin(handler(payload)));
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(boxed);
    }

    pub fn handler_count(&self, kind: K) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Deliver `payload` to every handler registered for `kind` and wait for all of them.
    ///
    /// Returns the number of handlers that ran to completion.
    pub async fn publish(&self, kind: K, payload: P) -> usize {
        let snapshot: Vec<Handler<P>> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        if snapshot.is_empty() {
            return 0;
        }

        let payload = Arc::new(payload);
        let mut running = Vec::with_capacity(snapshot.len());

        for handler in snapshot {
            let payload = payload.clone();
            match self.pool.schedule(async move { handler(payload).await }).await {
                Ok(handle) => running.push(handle),
                Err(err) => {
                    tracing::error!(event = ?kind, error = %err, "failed to schedule event handler");
                }
            }
        }

        let mut completed = 0;
        for handle in running {
            match handle.await {
                Ok(()) => completed += 1,
                Err(err) if err.is_panic() => {
                    tracing::error!(event = ?kind, "event handler panicked");
                }
                Err(err) => {
                    tracing::error!(event = ?kind, error = %err, "event handler aborted");
                }
            }
        }
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        Created,
        Closed,
    }

    fn bus(size: usize) -> EventBus<Kind, u32> {
        EventBus::new(WorkerPool::new(size, Duration::from_millis(30)))
    }

    #[tokio::test]
    async fn publish_without_handlers_is_noop() {
        let bus = bus(2);
        assert_eq!(bus.publish(Kind::Created, 1).await, 0);
    }

    #[tokio::test]
    async fn publish_waits_for_all_handlers() {
        let bus = bus(4);
        let sum = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let sum = sum.clone();
            bus.subscribe(Kind::Created, move |p: Arc<u32>| {
                let sum = sum.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    sum.fetch_add(*p as usize, Ordering::SeqCst);
                }
            });
        }

        assert_eq!(bus.handler_count(Kind::Created), 3);
        assert_eq!(bus.handler_count(Kind::Closed), 0);
        assert_eq!(bus.publish(Kind::Created, 5).await, 3);
        // every handler has finished by the time publish returns
        assert_eq!(sum.load(Ordering::SeqCst), 15);
    }

    #[tokio::test]
    async fn panicking_handler_does_not_block_others() {
        let bus = bus(4);
        let hits = Arc::new(AtomicUsize::new(0));

        bus.subscribe(Kind::Closed, |_p: Arc<u32>| async { panic!("handler bug") });
        let h = hits.clone();
        bus.subscribe(Kind::Closed, move |_p: Arc<u32>| {
            let h = h.clone();
            async move {
                h.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert_eq!(bus.publish(Kind::Closed, 0).await, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn saturated_pool_skips_handler() {
        let pool = WorkerPool::new(1, Duration::from_millis(20));
        let bus: EventBus<Kind, u32> = EventBus::new(pool.clone());

        let (release_tx, release_rx) = oneshot::channel::<()>();
        let blocker = pool
            .schedule(async move {
                let _ = release_rx.await;
            })
            .await
            .unwrap();

        bus.subscribe(Kind::Created, |_p: Arc<u32>| async {});
        assert_eq!(bus.publish(Kind::Created, 0).await, 0);

        release_tx.send(()).unwrap();
        blocker.await.unwrap();
        assert_eq!(bus.publish(Kind::Created, 0).await, 1);
    }
}
