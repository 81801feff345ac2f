//! Ordered delivery of one request's callbacks.
//!
//! `Lifecycle` is the only path from the job to the handler. It tracks the
//! handler state machine, refuses out-of-order events and marshals each
//! accepted event to the executor as its own task. Handler panics are
//! caught and logged so one bad callback cannot take a worker down.

use crate::base::neterror::NetError;
use crate::http::response::HttpResponse;
use crate::http::transport::ProgressSink;
use crate::urlrequest::executor::CallbackExecutor;
use crate::urlrequest::handle::RequestHandle;
use crate::urlrequest::handler::ResponseHandler;
use crate::urlrequest::registry::RequestRegistry;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

type SharedHandler = Arc<Mutex<Box<dyn ResponseHandler>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Started,
    Terminal,
    Finished,
}

/// Removes the request from the registry and marks its handle finished.
///
/// Rides along with the `on_finish` task and fires when that task is
/// dropped, whether or not the executor ever ran it.
struct Completion {
    handle: RequestHandle,
    registry: RequestRegistry,
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.registry.remove(self.handle.id());
        self.handle.mark_finished();
        tracing::debug!(request_id = self.handle.id(), "request finished");
    }
}

pub(crate) struct Lifecycle {
    handler: SharedHandler,
    executor: Arc<dyn CallbackExecutor>,
    handle: RequestHandle,
    phase: Phase,
    progress_open: Arc<AtomicBool>,
    completion: Option<Completion>,
}

impl Lifecycle {
    pub(crate) fn new(
        handler: Box<dyn ResponseHandler>,
        executor: Arc<dyn CallbackExecutor>,
        handle: RequestHandle,
        registry: RequestRegistry,
    ) -> Self {
        Self {
            handler: Arc::new(Mutex::new(handler)),
            executor,
            handle: handle.clone(),
            phase: Phase::Idle,
            progress_open: Arc::new(AtomicBool::new(false)),
            completion: Some(Completion { handle, registry }),
        }
    }

    fn post<F>(&self, event: &'static str, f: F)
    where
        F: FnOnce(&mut dyn ResponseHandler) + Send + 'static,
    {
        post(
            &self.executor,
            self.handler.clone(),
            self.handle.id(),
            event,
            f,
        );
    }

    fn refuse(&self, event: &'static str) -> bool {
        tracing::error!(
            request_id = self.handle.id(),
            event,
            phase = ?self.phase,
            "lifecycle event out of order, dropped"
        );
        false
    }

    pub(crate) fn start(&mut self) -> bool {
        if self.phase != Phase::Idle {
            return self.refuse("start");
        }
        self.phase = Phase::Started;
        self.post("start", |h| h.on_start());
        true
    }

    /// Allow progress reports for the attempt about to run.
    pub(crate) fn open_progress(&self) {
        if self.phase == Phase::Started {
            self.progress_open.store(true, Ordering::Release);
        }
    }

    pub(crate) fn close_progress(&self) {
        self.progress_open.store(false, Ordering::Release);
    }

    /// Sink handed to the transport. Reports arriving while progress is
    /// closed are dropped.
    pub(crate) fn progress_sink(&self) -> ProgressSink {
        let open = self.progress_open.clone();
        let executor = self.executor.clone();
        let handler = self.handler.clone();
        let request_id = self.handle.id();
        ProgressSink::new(move |bytes, total| {
            if open.load(Ordering::Acquire) {
                post(&executor, handler.clone(), request_id, "progress", move |h| {
                    h.on_progress(bytes, total)
                });
            }
        })
    }

    pub(crate) fn retry(&mut self, attempt: usize) -> bool {
        if self.phase != Phase::Started {
            return self.refuse("retry");
        }
        self.close_progress();
        self.post("retry", move |h| h.on_retry(attempt));
        true
    }

    fn enter_terminal(&mut self, event: &'static str, allow_idle: bool) -> bool {
        let allowed = self.phase == Phase::Started || (allow_idle && self.phase == Phase::Idle);
        if !allowed {
            return self.refuse(event);
        }
        self.close_progress();
        self.phase = Phase::Terminal;
        true
    }

    pub(crate) fn succeed(&mut self, response: HttpResponse) -> bool {
        if !self.enter_terminal("success", false) {
            return false;
        }
        self.post("success", move |h| h.on_success(response));
        true
    }

    pub(crate) fn fail(&mut self, response: Option<HttpResponse>, error: NetError) -> bool {
        if !self.enter_terminal("failure", false) {
            return false;
        }
        self.post("failure", move |h| h.on_failure(response, error));
        true
    }

    /// Also valid before `start`, for requests cancelled while queued.
    pub(crate) fn cancel(&mut self) -> bool {
        if !self.enter_terminal("cancel", true) {
            return false;
        }
        self.post("cancel", |h| h.on_cancel());
        true
    }

    pub(crate) fn finish(&mut self) -> bool {
        if self.phase != Phase::Terminal {
            return self.refuse("finish");
        }
        self.phase = Phase::Finished;
        let completion = self.completion.take();
        self.post("finish", move |h| {
            h.on_finish();
            drop(completion);
        });
        true
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        if self.phase == Phase::Finished {
            return;
        }
        tracing::error!(
            request_id = self.handle.id(),
            phase = ?self.phase,
            "request job ended without finishing"
        );
        self.handle.cancel(false);
        if self.phase != Phase::Terminal {
            self.cancel();
        }
        self.finish();
    }
}

fn post<F>(
    executor: &Arc<dyn CallbackExecutor>,
    handler: SharedHandler,
    request_id: u64,
    event: &'static str,
    f: F,
) where
    F: FnOnce(&mut dyn ResponseHandler) + Send + 'static,
{
    executor.execute(Box::new(move || {
        let mut guard = handler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let handler: &mut dyn ResponseHandler = &mut **guard;
        if catch_unwind(AssertUnwindSafe(|| f(handler))).is_err() {
            tracing::warn!(request_id, event, "response handler panicked");
        }
    }));
}
