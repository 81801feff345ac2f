//! # asyncnet
//!
//! An asynchronous, callback-driven HTTP client.
//!
//! Requests are issued off the caller's thread on a bounded worker pool.
//! Each request reports its lifecycle (start, progress, retry, success,
//! failure, cancel, finish) to a [`ResponseHandler`], on the
//! [`CallbackExecutor`] the caller chose, in a fixed order and with exactly
//! one terminal event. Requests can be cancelled one by one through their
//! [`RequestHandle`] or in bulk by tag.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use asyncnet::{Client, SerialExecutor, TextResponseHandler};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), asyncnet::NetError> {
//!     let client = Client::new()?;
//!     let handler = TextResponseHandler::new(|resp, text| {
//!         println!("{}: {} bytes", resp.status(), text.len());
//!     });
//!     let executor = Arc::new(SerialExecutor::new());
//!     let handle = client.get("http://example.com/").send(handler, executor)?;
//!     handle.finished().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error codes and request states
//! - [`http`] - Headers, bodies, responses, retry policy and the transport seam
//! - [`auth`] - Credential cache and preemptive authentication
//! - [`urlrequest`] - Dispatch, handles, handlers and executors
//! - [`client`] - The asynchronous client
//! - [`blocking`] - The synchronous client

pub mod auth;
pub mod base;
pub mod blocking;
pub mod client;
pub mod http;
pub mod urlrequest;

pub use auth::{AuthCache, AuthEntry, CredentialStore, PreemptiveAuthInterceptor};
pub use base::{ErrorKind, NetError, RequestState};
pub use blocking::SyncClient;
pub use client::{Client, ClientBuilder, RequestBuilder};
pub use crate::http::{Backoff, HttpResponse, RetryPolicy, Transport};
pub use urlrequest::{
    BinaryResponseHandler, CallbackExecutor, CallbackQueue, FileResponseHandler, FnHandler, Inline,
    JsonResponseHandler, Request, RequestHandle, ResponseHandler, SerialExecutor,
    TextResponseHandler,
};
