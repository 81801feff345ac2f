//! The transport capability the dispatcher drives.
//!
//! A transport performs one round trip for a fully prepared request and
//! returns the buffered response. Aborting is done by dropping the returned
//! future; transports that cannot stop mid-flight simply finish and the
//! dispatcher discards the result.

use crate::base::neterror::NetError;
use crate::http::response::HttpResponse;
use crate::urlrequest::request::Request;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Alias for the `Future` type returned by a transport.
pub type Executing = Pin<Box<dyn Future<Output = Result<HttpResponse, NetError>> + Send>>;

/// Performs HTTP round trips.
///
/// Implementations must be thread-safe: one transport instance serves
/// every worker of a client.
pub trait Transport: Send + Sync {
    /// Execute one attempt of `request`.
    ///
    /// Body progress may be reported through `progress` while the response
    /// is received.
    fn execute(&self, request: Request, progress: ProgressSink) -> Executing;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: Request, progress: ProgressSink) -> Executing {
        (**self).execute(request, progress)
    }
}

type ProgressFn = dyn Fn(u64, Option<u64>) + Send + Sync;

/// Receives `(bytes_so_far, total)` progress reports from a transport.
#[derive(Clone)]
pub struct ProgressSink {
    report: Option<Arc<ProgressFn>>,
}

impl ProgressSink {
    pub fn new(report: impl Fn(u64, Option<u64>) + Send + Sync + 'static) -> Self {
        Self {
            report: Some(Arc::new(report)),
        }
    }

    /// A sink that drops every report.
    pub fn noop() -> Self {
        Self { report: None }
    }

    pub fn report(&self, bytes: u64, total: Option<u64>) {
        if let Some(report) = &self.report {
            report(bytes, total);
        }
    }
}

impl Default for ProgressSink {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink")
            .field("active", &self.report.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_progress_sink_reports() {
        let seen = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&seen);
        let sink = ProgressSink::new(move |bytes, _| {
            counter.store(bytes, Ordering::SeqCst);
        });

        sink.clone().report(42, Some(100));
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_noop_sink() {
        ProgressSink::noop().report(1, None);
        assert!(format!("{:?}", ProgressSink::default()).contains("false"));
    }
}
