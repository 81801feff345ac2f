//! The lifecycle callback contract.
//!
//! A handler receives, in order: `on_start`, any number of `on_progress`
//! and `on_retry`, exactly one of `on_success`, `on_failure` or `on_cancel`,
//! then `on_finish`. A request cancelled before a worker picked it up skips
//! `on_start`. The dispatcher enforces this order; handlers do not need to
//! guard against it.

use crate::base::neterror::NetError;
use crate::http::response::HttpResponse;

/// Callbacks for one request. Every method defaults to a no-op.
///
/// A handler instance serves a single request and is never reused.
/// Callbacks run on the executor the request was submitted with.
pub trait ResponseHandler: Send + 'static {
    fn on_start(&mut self) {}

    /// `bytes` received so far and the total if the server announced it.
    fn on_progress(&mut self, _bytes: u64, _total: Option<u64>) {}

    /// Retry number `attempt` (starting at 1) is about to be scheduled.
    fn on_retry(&mut self, _attempt: usize) {}

    fn on_success(&mut self, _response: HttpResponse) {}

    /// `response` is present when the server answered with a non-2xx status.
    fn on_failure(&mut self, _response: Option<HttpResponse>, _error: NetError) {}

    fn on_cancel(&mut self) {}

    fn on_finish(&mut self) {}
}

type Callback<A> = Box<dyn FnMut(A) + Send>;

/// A handler assembled from closures.
///
/// ```rust,ignore
/// let handler = FnHandler::new()
///     .success(|resp| println!("{}", resp.status()))
///     .failure(|_, err| eprintln!("{err}"));
/// ```
#[derive(Default)]
pub struct FnHandler {
    start: Option<Callback<()>>,
    progress: Option<Callback<(u64, Option<u64>)>>,
    retry: Option<Callback<usize>>,
    success: Option<Callback<HttpResponse>>,
    failure: Option<Callback<(Option<HttpResponse>, NetError)>>,
    cancelled: Option<Callback<()>>,
    finish: Option<Callback<()>>,
}

impl FnHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, mut f: impl FnMut() + Send + 'static) -> Self {
        self.start = Some(Box::new(move |()| f()));
        self
    }

    pub fn progress(mut self, mut f: impl FnMut(u64, Option<u64>) + Send + 'static) -> Self {
        self.progress = Some(Box::new(move |(bytes, total)| f(bytes, total)));
        self
    }

    pub fn retry(mut self, f: impl FnMut(usize) + Send + 'static) -> Self {
        self.retry = Some(Box::new(f));
        self
    }

    pub fn success(mut self, f: impl FnMut(HttpResponse) + Send + 'static) -> Self {
        self.success = Some(Box::new(f));
        self
    }

    pub fn failure(
        mut self,
        mut f: impl FnMut(Option<HttpResponse>, NetError) + Send + 'static,
    ) -> Self {
        self.failure = Some(Box::new(move |(response, error)| f(response, error)));
        self
    }

    pub fn cancelled(mut self, mut f: impl FnMut() + Send + 'static) -> Self {
        self.cancelled = Some(Box::new(move |()| f()));
        self
    }

    pub fn finish(mut self, mut f: impl FnMut() + Send + 'static) -> Self {
        self.finish = Some(Box::new(move |()| f()));
        self
    }
}

impl ResponseHandler for FnHandler {
    fn on_start(&mut self) {
        if let Some(f) = &mut self.start {
            f(());
        }
    }

    fn on_progress(&mut self, bytes: u64, total: Option<u64>) {
        if let Some(f) = &mut self.progress {
            f((bytes, total));
        }
    }

    fn on_retry(&mut self, attempt: usize) {
        if let Some(f) = &mut self.retry {
            f(attempt);
        }
    }

    fn on_success(&mut self, response: HttpResponse) {
        if let Some(f) = &mut self.success {
            f(response);
        }
    }

    fn on_failure(&mut self, response: Option<HttpResponse>, error: NetError) {
        if let Some(f) = &mut self.failure {
            f((response, error));
        }
    }

    fn on_cancel(&mut self) {
        if let Some(f) = &mut self.cancelled {
            f(());
        }
    }

    fn on_finish(&mut self) {
        if let Some(f) = &mut self.finish {
            f(());
        }
    }
}
