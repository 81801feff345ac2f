//! Execution contexts for lifecycle callbacks.
//!
//! Every executor runs tasks in submission order; the per-request ordering
//! of callbacks depends on it.

use crate::urlrequest::handle::RequestHandle;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// A unit of callback work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Where lifecycle callbacks run.
///
/// Implementations must run tasks one at a time in the order they were
/// handed over.
pub trait CallbackExecutor: Send + Sync {
    fn execute(&self, task: Task);
}

impl<T: CallbackExecutor + ?Sized> CallbackExecutor for Arc<T> {
    fn execute(&self, task: Task) {
        (**self).execute(task)
    }
}

/// Runs callbacks directly on the worker that produced them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl CallbackExecutor for Inline {
    fn execute(&self, task: Task) {
        task()
    }
}

/// Runs callbacks one by one on a dedicated tokio task.
///
/// Callbacks should be short; a slow one delays every callback queued
/// behind it.
#[derive(Clone)]
pub struct SerialExecutor {
    tx: mpsc::UnboundedSender<Task>,
}

impl fmt::Debug for SerialExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialExecutor")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl SerialExecutor {
    /// Start the callback task on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new() -> Self {
        Self::with_handle(&tokio::runtime::Handle::current())
    }

    pub fn with_handle(handle: &tokio::runtime::Handle) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Task>();
        handle.spawn(async move {
            while let Some(task) = rx.recv().await {
                task();
            }
        });
        Self { tx }
    }
}

impl CallbackExecutor for SerialExecutor {
    fn execute(&self, task: Task) {
        if let Err(mpsc::error::SendError(task)) = self.tx.send(task) {
            // The runtime is gone; run the callback here so it is not lost.
            tracing::debug!("callback task stopped, running callback inline");
            task();
        }
    }
}

#[derive(Default)]
struct QueueState {
    tasks: Mutex<VecDeque<Task>>,
    ready: Condvar,
    notify: Notify,
}

/// A queue drained by the caller.
///
/// Callbacks run only when the owning thread calls [`run_pending`],
/// [`run_until_finished`] or [`blocking_run_until_finished`]. This is how
/// callbacks are delivered to a specific thread such as a UI loop.
///
/// [`run_pending`]: CallbackQueue::run_pending
/// [`run_until_finished`]: CallbackQueue::run_until_finished
/// [`blocking_run_until_finished`]: CallbackQueue::blocking_run_until_finished
#[derive(Clone, Default)]
pub struct CallbackQueue {
    state: Arc<QueueState>,
}

impl fmt::Debug for CallbackQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackQueue")
            .field("pending", &self.len())
            .finish()
    }
}

impl CallbackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Task>> {
        self.state
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run every queued callback, including ones queued while running.
    /// Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // The lock is released before the task runs.
            let next = self.lock().pop_front();
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Drain callbacks until `handle` has dispatched `on_finish`.
    pub async fn run_until_finished(&self, handle: &RequestHandle) {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            self.run_pending();
            if handle.is_finished() {
                return;
            }
            notified.await;
        }
    }

    /// Blocking form of [`run_until_finished`](Self::run_until_finished)
    /// for threads without a runtime.
    pub fn blocking_run_until_finished(&self, handle: &RequestHandle) {
        loop {
            self.run_pending();
            if handle.is_finished() {
                return;
            }
            let guard = self.lock();
            let _unused = self
                .state
                .ready
                .wait_timeout_while(guard, Duration::from_millis(50), |tasks| tasks.is_empty())
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }
}

impl CallbackExecutor for CallbackQueue {
    fn execute(&self, task: Task) {
        self.lock().push_back(task);
        self.state.ready.notify_all();
        self.state.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder() -> (Arc<Mutex<Vec<usize>>>, impl Fn(usize) -> Task) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |n: usize| -> Task {
            let sink = sink.clone();
            Box::new(move || sink.lock().unwrap().push(n))
        };
        (log, make)
    }

    #[test]
    fn test_inline_runs_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        Inline.execute(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_queue_is_fifo_and_caller_driven() {
        let (log, task) = recorder();
        let queue = CallbackQueue::new();
        for n in 0..5 {
            queue.execute(task(n));
        }
        assert!(log.lock().unwrap().is_empty());

        assert_eq!(queue.run_pending(), 5);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_queue_runs_tasks_queued_by_tasks() {
        let queue = CallbackQueue::new();
        let inner = queue.clone();
        let hit = Arc::new(AtomicUsize::new(0));
        let h = hit.clone();
        queue.execute(Box::new(move || {
            inner.execute(Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        assert_eq!(queue.run_pending(), 2);
        assert_eq!(hit.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_serial_executor_preserves_order() {
        let (log, task) = recorder();
        let executor = SerialExecutor::new();
        for n in 0..100 {
            executor.execute(task(n));
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        executor.execute(Box::new(move || {
            let _ = tx.send(());
        }));
        rx.await.unwrap();

        assert_eq!(*log.lock().unwrap(), (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_run_until_finished() {
        let queue = CallbackQueue::new();
        let handle = RequestHandle::new(1, None);
        let marker = handle.clone();
        queue.execute(Box::new(move || marker.mark_finished()));

        queue.run_until_finished(&handle).await;
        assert!(handle.is_finished());
    }
}
