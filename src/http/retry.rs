//! Retry policy with idempotency rules and configurable backoff.
//!
//! Idempotent methods are retried on connection-level failures and on a set
//! of transient statuses. Non-idempotent methods are retried only for
//! whitelisted causes, by default the failures that happen before any
//! request byte leaves the client.

use crate::base::neterror::{ErrorKind, NetError};
use http::{Method, StatusCode};
use std::collections::BTreeSet;
use std::time::Duration;

/// Transport failures that are worth another attempt for idempotent requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// Server closed connection unexpectedly
    ConnectionReset,
    /// Connection was closed during request
    ConnectionClosed,
    /// Connection was aborted
    ConnectionAborted,
    /// Connection could not be established
    ConnectionRefused,
    /// Connect failed for another reason
    ConnectionFailed,
    /// Host name did not resolve
    NameNotResolved,
    /// Socket not connected
    SocketNotConnected,
    /// Empty response received
    EmptyResponse,
    /// Request timed out at the transport
    HttpRequestTimeout,
}

impl RetryReason {
    /// Map a NetError to a RetryReason, if the error is retryable.
    pub fn from_error(error: &NetError) -> Option<Self> {
        match error {
            NetError::ConnectionReset => Some(Self::ConnectionReset),
            NetError::ConnectionClosed => Some(Self::ConnectionClosed),
            NetError::ConnectionAborted => Some(Self::ConnectionAborted),
            NetError::ConnectionRefused => Some(Self::ConnectionRefused),
            NetError::ConnectionFailed | NetError::ConnectionFailedTo { .. } => {
                Some(Self::ConnectionFailed)
            }
            NetError::NameNotResolved | NetError::NameNotResolvedFor { .. } => {
                Some(Self::NameNotResolved)
            }
            NetError::SocketNotConnected => Some(Self::SocketNotConnected),
            NetError::EmptyResponse => Some(Self::EmptyResponse),
            NetError::ConnectionTimedOut => Some(Self::HttpRequestTimeout),
            _ => None,
        }
    }
}

/// Delay strategy between attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// The same delay before every retry.
    Fixed(Duration),
    /// `base * 2^(retry - 1)`, capped at `max`, plus deterministic jitter of
    /// up to `jitter_factor` of the capped delay.
    Exponential {
        base: Duration,
        max: Duration,
        jitter_factor: f64,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_millis(5000),
            jitter_factor: 0.1,
        }
    }
}

impl Backoff {
    /// Delay before retry number `retry` (1 for the first retry).
    pub fn delay(&self, retry: usize) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        match self {
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential {
                base,
                max,
                jitter_factor,
            } => {
                let base_ms = base.as_millis() as u64;
                let max_ms = max.as_millis() as u64;

                let delay_ms = base_ms.saturating_mul(1 << (retry - 1).min(10));
                let capped_ms = delay_ms.min(max_ms);

                let jitter_range = (capped_ms as f64 * jitter_factor) as u64;
                let jittered_ms = if jitter_range > 0 {
                    let jitter = (retry as u64 * 7) % jitter_range;
                    capped_ms.saturating_add(jitter)
                } else {
                    capped_ms
                };

                Duration::from_millis(jittered_ms)
            }
        }
    }
}

/// What went wrong with the last attempt.
#[derive(Debug, Clone, Copy)]
pub enum RetryCause<'a> {
    Error(&'a NetError),
    Status(StatusCode),
}

/// Outcome of consulting the policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Run attempt `attempt + 1` after `delay`. `attempt` is also the retry
    /// number reported through `on_retry`.
    Retry { attempt: usize, delay: Duration },
    /// Stop. `exhausted` is set when the cause was retryable but the
    /// attempt limit was reached.
    GiveUp { attempts: usize, exhausted: bool },
}

impl RetryDecision {
    pub fn is_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry { .. })
    }
}

/// Methods that can be replayed without duplicating side effects.
pub fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS | Method::TRACE
    )
}

/// Decides whether and when a failed request runs again.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    backoff: Backoff,
    retryable_statuses: BTreeSet<u16>,
    whitelist: BTreeSet<i32>,
    blacklist: BTreeSet<i32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: Backoff::default(),
            retryable_statuses: [408, 429, 500, 502, 503, 504].into_iter().collect(),
            whitelist: [
                NetError::ConnectionRefused,
                NetError::ConnectionFailed,
                NetError::NameNotResolved,
                NetError::InternetDisconnected,
                NetError::AddressUnreachable,
            ]
            .iter()
            .map(NetError::as_i32)
            .collect(),
            blacklist: [NetError::Aborted.as_i32()].into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Retries allowed beyond the first attempt.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Also retry idempotent requests answered with `status`.
    pub fn retry_on_status(mut self, status: u16) -> Self {
        self.retryable_statuses.insert(status);
        self
    }

    /// Replace the set of retryable statuses.
    pub fn retryable_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_statuses = statuses.into_iter().collect();
        self
    }

    /// Retry this error for every method, including non-idempotent ones.
    pub fn whitelist(mut self, error: &NetError) -> Self {
        self.blacklist.remove(&error.as_i32());
        self.whitelist.insert(error.as_i32());
        self
    }

    /// Never retry this error.
    pub fn blacklist(mut self, error: &NetError) -> Self {
        self.whitelist.remove(&error.as_i32());
        self.blacklist.insert(error.as_i32());
        self
    }

    pub fn get_max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn get_backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Whether `cause` is worth retrying for `method`, ignoring the limit.
    pub fn is_retryable(&self, cause: RetryCause<'_>, method: &Method) -> bool {
        match cause {
            RetryCause::Error(error) => {
                let code = error.as_i32();
                if self.blacklist.contains(&code) {
                    return false;
                }
                match error.kind() {
                    ErrorKind::Cancellation
                    | ErrorKind::InvalidRequest
                    | ErrorKind::Encoding
                    | ErrorKind::RetryExhausted => return false,
                    _ => {}
                }
                if self.whitelist.contains(&code) {
                    return true;
                }
                is_idempotent(method) && RetryReason::from_error(error).is_some()
            }
            RetryCause::Status(status) => {
                is_idempotent(method) && self.retryable_statuses.contains(&status.as_u16())
            }
        }
    }

    /// Decide after attempt number `attempt_count` (1 after the first) failed.
    pub fn should_retry(
        &self,
        cause: RetryCause<'_>,
        attempt_count: usize,
        method: &Method,
    ) -> RetryDecision {
        if !self.is_retryable(cause, method) {
            return RetryDecision::GiveUp {
                attempts: attempt_count,
                exhausted: false,
            };
        }
        if attempt_count > self.max_retries {
            return RetryDecision::GiveUp {
                attempts: attempt_count,
                exhausted: self.max_retries > 0,
            };
        }
        RetryDecision::Retry {
            attempt: attempt_count,
            delay: self.backoff.delay(attempt_count),
        }
    }
}
