//! Execution of a single submitted request.
//!
//! A job waits for a worker slot, claims its handle, runs attempts against
//! the transport under the retry policy and reports the outcome through its
//! [`Lifecycle`]. Cancellation is checked while queued, during an attempt
//! (interrupt only), after each attempt, during backoff and at the final
//! running -> completed transition.

use crate::auth::preemptive::PreemptiveAuthInterceptor;
use crate::base::neterror::NetError;
use crate::http::response::HttpResponse;
use crate::http::retry::{RetryCause, RetryDecision, RetryPolicy};
use crate::http::transport::Transport;
use crate::urlrequest::handle::RequestHandle;
use crate::urlrequest::lifecycle::Lifecycle;
use crate::urlrequest::pool::acquire;
use crate::urlrequest::request::Request;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

enum Outcome {
    Success(HttpResponse),
    Failure(Option<HttpResponse>, NetError),
    Cancelled,
}

pub(crate) struct RequestJob {
    pub(crate) request: Request,
    pub(crate) handle: RequestHandle,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) policy: RetryPolicy,
    pub(crate) interceptor: Option<PreemptiveAuthInterceptor>,
    pub(crate) slots: Arc<Semaphore>,
    pub(crate) deadline: Option<Instant>,
}

impl RequestJob {
    pub(crate) async fn run(mut self) {
        let handle = self.handle.clone();
        let outcome = match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    outcome = self.drive() => outcome,
                    _ = tokio::time::sleep_until(deadline) => {
                        tracing::debug!(request_id = handle.id(), "request timed out");
                        handle.cancel(true);
                        Outcome::Cancelled
                    }
                }
            }
            None => self.drive().await,
        };

        match outcome {
            Outcome::Success(response) if handle.complete() => {
                self.lifecycle.succeed(response);
            }
            Outcome::Failure(response, error) if handle.complete() => {
                tracing::debug!(request_id = handle.id(), error = %error, "request failed");
                self.lifecycle.fail(response, error);
            }
            _ => {
                handle.cancel(false);
                self.lifecycle.cancel();
            }
        }
        self.lifecycle.finish();
    }

    async fn wait_for_slot(&self) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            biased;
            _ = self.handle.cancelled() => None,
            permit = acquire(&self.slots) => permit,
        }
    }

    async fn drive(&mut self) -> Outcome {
        let Some(permit) = self.wait_for_slot().await else {
            return Outcome::Cancelled;
        };
        if !self.handle.claim() {
            return Outcome::Cancelled;
        }
        let mut permit = Some(permit);

        tracing::debug!(
            request_id = self.handle.id(),
            method = %self.request.method(),
            url = %self.request.url(),
            "request claimed"
        );
        self.lifecycle.start();

        if let Some(interceptor) = &self.interceptor {
            interceptor.intercept(&mut self.request, false);
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            tracing::debug!(
                request_id = self.handle.id(),
                attempt = attempts,
                "sending request"
            );

            self.lifecycle.open_progress();
            let result = self.attempt().await;
            self.lifecycle.close_progress();

            let Some(result) = result else {
                return Outcome::Cancelled;
            };
            if self.handle.is_cancelled() {
                return Outcome::Cancelled;
            }

            // A transport that aborted on its own still reports as a cancel.
            if let Err(error) = &result {
                if error.is_cancellation() {
                    tracing::debug!(
                        request_id = self.handle.id(),
                        error = %error,
                        "transport aborted"
                    );
                    self.handle.cancel(false);
                    return Outcome::Cancelled;
                }
            }

            let (response, error) = match result {
                Ok(response) if response.is_success() => return Outcome::Success(response),
                Ok(response) => {
                    let status = response.status();
                    (Some(response), NetError::HttpStatus(status))
                }
                Err(error) => (None, error),
            };

            let cause = match &response {
                Some(response) => RetryCause::Status(response.status()),
                None => RetryCause::Error(&error),
            };
            let decision = self
                .policy
                .should_retry(cause, attempts, self.request.method());

            match decision {
                RetryDecision::GiveUp {
                    attempts,
                    exhausted,
                } => {
                    let error = if exhausted {
                        NetError::TooManyRetries {
                            attempts,
                            last: Box::new(error),
                        }
                    } else {
                        error
                    };
                    return Outcome::Failure(response, error);
                }
                RetryDecision::Retry { attempt, delay } => {
                    tracing::debug!(
                        request_id = self.handle.id(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying request"
                    );
                    self.lifecycle.retry(attempt);

                    // No worker slot is held during the backoff.
                    drop(permit.take());
                    tokio::select! {
                        biased;
                        _ = self.handle.cancelled() => return Outcome::Cancelled,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    match self.wait_for_slot().await {
                        Some(p) => permit = Some(p),
                        None => return Outcome::Cancelled,
                    }
                }
            }
        }
    }

    /// One transport call. `None` when interrupted by a cancel.
    async fn attempt(&self) -> Option<Result<HttpResponse, NetError>> {
        let sink = self.lifecycle.progress_sink();
        let request = self.request.clone();
        let executing = match std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.transport.execute(request, sink)
        })) {
            Ok(executing) => executing,
            Err(_) => return Some(Err(self.transport_panicked())),
        };

        tokio::select! {
            biased;
            _ = self.handle.interrupted() => None,
            result = AssertUnwindSafe(executing).catch_unwind() => {
                Some(result.unwrap_or_else(|_| Err(self.transport_panicked())))
            }
        }
    }

    fn transport_panicked(&self) -> NetError {
        tracing::error!(request_id = self.handle.id(), "transport panicked");
        NetError::internal("transport panicked")
    }
}
