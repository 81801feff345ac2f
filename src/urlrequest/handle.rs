//! Cancellable token for one submitted request.
//!
//! The handle is shared between the caller and the job. Its state is a
//! single atomic so that a cancel racing a terminal dispatch has exactly one
//! winner.

use crate::base::loadstate::RequestState;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

struct Inner {
    id: u64,
    tag: Option<String>,
    state: AtomicU8,
    interrupt: AtomicBool,
    finished: AtomicBool,
    cancel: Notify,
    finish: Notify,
}

/// Handle to a queued or in-flight request.
#[derive(Clone)]
pub struct RequestHandle {
    inner: Arc<Inner>,
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("id", &self.inner.id)
            .field("tag", &self.inner.tag)
            .field("state", &self.state())
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl RequestHandle {
    pub(crate) fn new(id: u64, tag: Option<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id,
                tag,
                state: AtomicU8::new(RequestState::Queued as u8),
                interrupt: AtomicBool::new(false),
                finished: AtomicBool::new(false),
                cancel: Notify::new(),
                finish: Notify::new(),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn tag(&self) -> Option<&str> {
        self.inner.tag.as_deref()
    }

    pub fn state(&self) -> RequestState {
        RequestState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == RequestState::Cancelled
    }

    /// True once `on_finish` has been dispatched and the request left the
    /// registry.
    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
    }

    /// Cancel the request.
    ///
    /// A queued request is woken and ends without running. A running one
    /// has its transport call dropped only when `interrupt_if_running` is
    /// set; otherwise the attempt finishes and its result is discarded.
    /// Returns `true` if this call moved the request to cancelled.
    pub fn cancel(&self, interrupt_if_running: bool) -> bool {
        if interrupt_if_running {
            self.inner.interrupt.store(true, Ordering::Release);
        }

        let mut current = self.inner.state.load(Ordering::Acquire);
        let cancelled = loop {
            match RequestState::from_u8(current) {
                RequestState::Queued | RequestState::Running => {
                    match self.inner.state.compare_exchange(
                        current,
                        RequestState::Cancelled as u8,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    ) {
                        Ok(_) => break true,
                        Err(actual) => current = actual,
                    }
                }
                _ => break false,
            }
        };

        if cancelled {
            tracing::debug!(
                request_id = self.inner.id,
                interrupt = interrupt_if_running,
                "request cancelled"
            );
        }
        // A later cancel(true) upgrades an earlier soft cancel.
        if cancelled || (interrupt_if_running && self.is_cancelled()) {
            self.inner.cancel.notify_waiters();
        }
        cancelled
    }

    /// Wait until `on_finish` has been dispatched.
    pub async fn finished(&self) {
        loop {
            let notified = self.inner.finish.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_finished() {
                return;
            }
            notified.await;
        }
    }

    /// Queued -> Running. Fails if the request was cancelled first.
    pub(crate) fn claim(&self) -> bool {
        self.transition(RequestState::Queued, RequestState::Running)
    }

    /// Running -> Completed. Fails if a cancel won the race.
    pub(crate) fn complete(&self) -> bool {
        self.transition(RequestState::Running, RequestState::Completed)
    }

    fn transition(&self, from: RequestState, to: RequestState) -> bool {
        self.inner
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn interrupt_requested(&self) -> bool {
        self.inner.interrupt.load(Ordering::Acquire)
    }

    /// Resolves once the request is cancelled.
    pub(crate) async fn cancelled(&self) {
        loop {
            let notified = self.inner.cancel.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Resolves once the request is cancelled with interrupt. A soft cancel
    /// keeps waiting in case it is upgraded.
    pub(crate) async fn interrupted(&self) {
        loop {
            let notified = self.inner.cancel.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() && self.interrupt_requested() {
                return;
            }
            notified.await;
        }
    }

    pub(crate) fn mark_finished(&self) {
        self.inner.finished.store(true, Ordering::Release);
        self.inner.finish.notify_waiters();
    }
}
