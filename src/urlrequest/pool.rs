//! Bounded worker slots on a tokio runtime.

use crate::base::neterror::NetError;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Runs request jobs with at most `size` of them executing at once.
///
/// Jobs past the limit wait on a FIFO-fair semaphore, so nothing is
/// dropped and slots are granted in submission order. The runtime is the
/// caller's when one is available; otherwise the pool owns a multi-thread
/// runtime and shuts it down when closed.
pub(crate) struct WorkerPool {
    slots: Arc<Semaphore>,
    size: usize,
    handle: Handle,
    owned: Mutex<Option<Runtime>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("available", &self.slots.available_permits())
            .field("owns_runtime", &self.owns_runtime())
            .finish()
    }
}

impl WorkerPool {
    pub(crate) fn new(size: usize, runtime: Option<Handle>) -> Result<Self, NetError> {
        let size = size.max(1);
        let (handle, owned) = match runtime.or_else(|| Handle::try_current().ok()) {
            Some(handle) => (handle, None),
            None => {
                let runtime = Builder::new_multi_thread()
                    .worker_threads(size)
                    .thread_name("asyncnet-worker")
                    .enable_all()
                    .build()
                    .map_err(|e| NetError::internal(format!("failed to start runtime: {e}")))?;
                tracing::debug!(size, "started owned worker runtime");
                (runtime.handle().clone(), Some(runtime))
            }
        };

        Ok(Self {
            slots: Arc::new(Semaphore::new(size)),
            size,
            handle,
            owned: Mutex::new(owned),
        })
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn slots(&self) -> Arc<Semaphore> {
        self.slots.clone()
    }

    pub(crate) fn spawn<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(job);
    }

    fn owns_runtime(&self) -> bool {
        self.owned.lock().map(|o| o.is_some()).unwrap_or(false)
    }

    /// Refuse further slot grants and stop an owned runtime.
    ///
    /// Jobs still waiting for a slot observe the closed semaphore and end
    /// as cancelled.
    pub(crate) fn close(&self) {
        self.slots.close();
        let owned = self.owned.lock().ok().and_then(|mut o| o.take());
        if let Some(runtime) = owned {
            runtime.shutdown_background();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

/// Wait for a worker slot. `None` once the pool is closed.
pub(crate) async fn acquire(slots: &Arc<Semaphore>) -> Option<OwnedSemaphorePermit> {
    slots.clone().acquire_owned().await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_borrows_current_runtime() {
        let pool = WorkerPool::new(2, None).unwrap();
        assert!(!pool.owns_runtime());
        assert_eq!(pool.size(), 2);
    }

    #[test]
    fn test_owns_runtime_outside_tokio() {
        let pool = WorkerPool::new(1, None).unwrap();
        assert!(pool.owns_runtime());

        let (tx, rx) = std::sync::mpsc::channel();
        pool.spawn(async move {
            tx.send(42).unwrap();
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);

        pool.close();
        assert!(!pool.owns_runtime());
    }

    #[tokio::test]
    async fn test_slots_are_bounded_and_closable() {
        let pool = WorkerPool::new(1, None).unwrap();
        let slots = pool.slots();

        let first = acquire(&slots).await.unwrap();
        let second = tokio::time::timeout(Duration::from_millis(20), acquire(&slots)).await;
        assert!(second.is_err());

        drop(first);
        assert!(acquire(&slots).await.is_some());

        pool.close();
        assert!(acquire(&slots).await.is_none());
    }
}
