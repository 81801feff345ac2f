//! Callback-driven HTTP client with builder pattern.
//!
//! # Example
//!
//! ```rust,ignore
//! use asyncnet::{Client, FnHandler, SerialExecutor};
//! use std::sync::Arc;
//!
//! let client = Client::builder().max_retries(3).build()?;
//! let executor = Arc::new(SerialExecutor::new());
//!
//! let handle = client
//!     .get("http://example.com/")
//!     .tag("home")
//!     .send(FnHandler::new().success(|resp| println!("{}", resp.status())), executor)?;
//!
//! handle.finished().await;
//! ```

use crate::auth::authcache::{AuthCache, CredentialStore};
use crate::base::neterror::NetError;
use crate::http::multipart::Form;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::requestbody::{FormBody, RequestBody};
use crate::http::retry::{Backoff, RetryPolicy};
use crate::http::transport::Transport;
use crate::urlrequest::context::{RequestContext, RequestContextConfig};
use crate::urlrequest::executor::CallbackExecutor;
use crate::urlrequest::handle::RequestHandle;
use crate::urlrequest::handler::ResponseHandler;
use crate::urlrequest::registry::RequestRegistry;
use crate::urlrequest::request::Request;
use http::Method;
use std::sync::Arc;
use std::time::Duration;

/// Asynchronous HTTP client.
///
/// Cheap to clone; clones share the worker pool, registry and credentials.
/// Use [`Client::builder()`] to configure one.
#[derive(Clone, Debug)]
pub struct Client {
    context: Arc<RequestContext>,
}

impl Client {
    /// Create a new client with default settings.
    pub fn new() -> Result<Self, NetError> {
        Self::builder().build()
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Submit a prepared request.
    ///
    /// Returns immediately. Callbacks run on `executor`.
    pub fn submit<H>(
        &self,
        request: Request,
        handler: H,
        executor: Arc<dyn CallbackExecutor>,
        tag: Option<&str>,
    ) -> Result<RequestHandle, NetError>
    where
        H: ResponseHandler,
    {
        self.context
            .submit(request, Box::new(handler), executor, tag)
    }

    /// Start building a GET request.
    pub fn get<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Start building a POST request.
    pub fn post<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Start building a PUT request.
    pub fn put<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Start building a DELETE request.
    pub fn delete<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Start building a HEAD request.
    pub fn head<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// Start building a PATCH request.
    pub fn patch<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    /// Start building a request with custom method.
    pub fn request<U: AsRef<str>>(&self, method: Method, url: U) -> RequestBuilder {
        RequestBuilder {
            client: self.clone(),
            request: Request::new(method, url.as_ref()),
            tag: None,
            error: None,
        }
    }

    /// Cancel every request submitted under `tag`.
    pub fn cancel_requests(&self, tag: &str, interrupt: bool) -> usize {
        self.context.cancel_requests(tag, interrupt)
    }

    /// Cancel every live request.
    pub fn cancel_all(&self, interrupt: bool) -> usize {
        self.context.cancel_all(interrupt)
    }

    /// Cancel everything and refuse further requests.
    pub fn shutdown(&self) {
        self.context.shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.context.is_shut_down()
    }

    /// Credentials for preemptive auth.
    pub fn auth_cache(&self) -> &AuthCache {
        self.context.auth_cache()
    }

    pub fn registry(&self) -> &RequestRegistry {
        self.context.registry()
    }

    /// Number of requests submitted and not yet finished.
    pub fn active_requests(&self) -> usize {
        self.context.registry().len()
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

/// Builder for creating a [`Client`].
#[derive(Default, Debug)]
pub struct ClientBuilder {
    config: RequestContextConfig,
}

impl ClientBuilder {
    /// Retries beyond the first attempt.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Delay strategy between attempts.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// Use a complete retry policy instead of `max_retries`/`backoff`.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry_policy = Some(policy);
        self
    }

    /// Number of requests allowed to execute at once.
    pub fn worker_pool_size(mut self, size: usize) -> Self {
        self.config.worker_pool_size = size;
        self
    }

    /// Send stored credentials without waiting for a challenge.
    pub fn preemptive_auth(mut self, enabled: bool) -> Self {
        self.config.preemptive_auth = enabled;
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Run jobs on this runtime.
    pub fn runtime(mut self, handle: tokio::runtime::Handle) -> Self {
        self.config.runtime = Some(handle);
        self
    }

    /// Replace the default HTTP/1.1 transport.
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.config.transport = Some(Arc::new(transport));
        self
    }

    /// Look up preemptive credentials here instead of the built-in cache.
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.config.credential_store = Some(store);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client, NetError> {
        let context = RequestContext::with_config(self.config)?;
        Ok(Client {
            context: Arc::new(context),
        })
    }
}

/// Builder for a single request.
///
/// Header and body errors are held until [`send`](Self::send), which
/// returns the first one.
#[derive(Debug)]
pub struct RequestBuilder {
    client: Client,
    request: Request,
    tag: Option<String>,
    error: Option<NetError>,
}

impl RequestBuilder {
    /// Set a header, replacing earlier values of the same name.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let Err(e) = self.request.headers_mut().insert(name, value) {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Add a header, keeping earlier values of the same name.
    pub fn append_header(mut self, name: &str, value: &str) -> Self {
        if let Err(e) = self.request.headers_mut().append(name, value) {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Replace all headers.
    pub fn headers(mut self, headers: OrderedHeaderMap) -> Self {
        self.request = self.request.with_headers(headers);
        self
    }

    /// Set request body.
    pub fn body<B: Into<RequestBody>>(mut self, body: B) -> Self {
        self.request = self.request.with_body(body);
        self
    }

    /// URL-encoded form body.
    pub fn form(mut self, form: FormBody) -> Self {
        self.request = self.request.with_encoder(form);
        self
    }

    /// Set JSON body.
    #[cfg(feature = "json")]
    pub fn json<T: serde::Serialize + ?Sized>(mut self, json: &T) -> Self {
        match RequestBody::encode(&crate::http::requestbody::JsonBody(json)) {
            Ok(body) => self.request = self.request.with_body(body),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    /// multipart/form-data body; file parts are read at `send`.
    pub fn multipart(mut self, form: Form) -> Self {
        self.request = self.request.with_encoder(form);
        self
    }

    /// Group the request for [`Client::cancel_requests`].
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request = self.request.with_timeout(timeout);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.request = self.request.with_retry_policy(policy);
        self
    }

    pub fn preemptive_auth(mut self, enabled: bool) -> Self {
        self.request = self.request.with_preemptive_auth(enabled);
        self
    }

    /// Finish building without sending.
    pub fn build(self) -> Result<Request, NetError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.request),
        }
    }

    /// Send the request.
    pub fn send<H>(
        self,
        handler: H,
        executor: Arc<dyn CallbackExecutor>,
    ) -> Result<RequestHandle, NetError>
    where
        H: ResponseHandler,
    {
        let client = self.client.clone();
        let tag = self.tag.clone();
        let request = self.build()?;
        client.submit(request, handler, executor, tag.as_deref())
    }
}
