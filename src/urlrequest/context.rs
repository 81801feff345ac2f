//! Request context - shared state behind a client.
//!
//! Bundles the transport, credentials, retry defaults, worker pool and
//! request registry, and implements `submit`.

use crate::auth::authcache::{AuthCache, CredentialStore};
use crate::auth::preemptive::PreemptiveAuthInterceptor;
use crate::base::neterror::NetError;
use crate::http::h1transport::H1Transport;
use crate::http::retry::{Backoff, RetryPolicy};
use crate::http::transport::Transport;
use crate::urlrequest::executor::CallbackExecutor;
use crate::urlrequest::handle::RequestHandle;
use crate::urlrequest::handler::ResponseHandler;
use crate::urlrequest::job::RequestJob;
use crate::urlrequest::lifecycle::Lifecycle;
use crate::urlrequest::pool::WorkerPool;
use crate::urlrequest::registry::RequestRegistry;
use crate::urlrequest::request::Request;
use http::header::{HeaderValue, USER_AGENT};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Default `User-Agent` sent when a request sets none.
pub const DEFAULT_USER_AGENT: &str = concat!("asyncnet/", env!("CARGO_PKG_VERSION"));

/// Configuration options for [`RequestContext`].
#[derive(Clone)]
pub struct RequestContextConfig {
    /// Retries beyond the first attempt.
    pub max_retries: usize,

    /// Delay between attempts.
    pub backoff: Backoff,

    /// Full retry policy; replaces `max_retries` and `backoff` when set.
    pub retry_policy: Option<RetryPolicy>,

    /// Requests executing at once.
    pub worker_pool_size: usize,

    /// Attach stored credentials before the first round trip.
    pub preemptive_auth: bool,

    /// Per-request deadline measured from submission.
    pub timeout: Option<Duration>,

    /// User-Agent for requests that do not set one.
    pub user_agent: String,

    /// Runtime to run jobs on. `None` uses the current runtime or starts
    /// an owned one.
    pub runtime: Option<Handle>,

    /// Transport (None = plain HTTP/1.1 over TCP).
    pub transport: Option<Arc<dyn Transport>>,

    /// Credential source for preemptive auth (None = the context's
    /// `AuthCache`).
    pub credential_store: Option<Arc<dyn CredentialStore>>,
}

impl Default for RequestContextConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: Backoff::default(),
            retry_policy: None,
            worker_pool_size: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            preemptive_auth: false,
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            runtime: None,
            transport: None,
            credential_store: None,
        }
    }
}

impl std::fmt::Debug for RequestContextConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContextConfig")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("retry_policy", &self.retry_policy)
            .field("worker_pool_size", &self.worker_pool_size)
            .field("preemptive_auth", &self.preemptive_auth)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("runtime", &self.runtime.is_some())
            .field("transport", &self.transport.is_some())
            .field("credential_store", &self.credential_store.is_some())
            .finish()
    }
}

/// Shared state for submitting and tracking requests.
pub struct RequestContext {
    transport: Arc<dyn Transport>,
    auth_cache: AuthCache,
    credentials: Arc<dyn CredentialStore>,
    registry: RequestRegistry,
    pool: WorkerPool,
    retry_policy: RetryPolicy,
    next_id: AtomicU64,
    shut_down: AtomicBool,
    config: RequestContextConfig,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("pool", &self.pool)
            .field("active", &self.registry.len())
            .field("shut_down", &self.is_shut_down())
            .field("config", &self.config)
            .finish()
    }
}

impl RequestContext {
    /// Create a context with default configuration.
    pub fn new() -> Result<Self, NetError> {
        Self::with_config(RequestContextConfig::default())
    }

    pub fn with_config(config: RequestContextConfig) -> Result<Self, NetError> {
        let pool = WorkerPool::new(config.worker_pool_size, config.runtime.clone())?;
        let transport: Arc<dyn Transport> = config
            .transport
            .clone()
            .unwrap_or_else(|| Arc::new(H1Transport::new()));
        let auth_cache = AuthCache::new();
        let credentials: Arc<dyn CredentialStore> = config
            .credential_store
            .clone()
            .unwrap_or_else(|| Arc::new(auth_cache.clone()));
        let retry_policy = config.retry_policy.clone().unwrap_or_else(|| {
            RetryPolicy::new()
                .max_retries(config.max_retries)
                .backoff(config.backoff.clone())
        });

        Ok(Self {
            transport,
            auth_cache,
            credentials,
            registry: RequestRegistry::new(),
            pool,
            retry_policy,
            next_id: AtomicU64::new(1),
            shut_down: AtomicBool::new(false),
            config,
        })
    }

    /// Queue `request` and return its handle.
    ///
    /// Fails without creating a handle when the target is empty, the body
    /// cannot be encoded, or the context is shut down. Every other failure
    /// reaches the handler through `on_failure`.
    pub fn submit(
        &self,
        mut request: Request,
        handler: Box<dyn ResponseHandler>,
        executor: Arc<dyn CallbackExecutor>,
        tag: Option<&str>,
    ) -> Result<RequestHandle, NetError> {
        if self.is_shut_down() {
            return Err(NetError::ClientShutdown);
        }
        request.prepare()?;
        if !request.headers().contains("user-agent") {
            if let Ok(value) = HeaderValue::from_str(&self.config.user_agent) {
                request.headers_mut().insert_typed(USER_AGENT, value);
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = RequestHandle::new(id, tag.map(str::to_owned));
        self.registry.register(handle.clone());

        let overrides = request.overrides().clone();
        let preemptive = overrides
            .preemptive_auth
            .unwrap_or(self.config.preemptive_auth);
        let timeout = overrides.timeout.or(self.config.timeout);

        tracing::debug!(
            request_id = id,
            method = %request.method(),
            url = %request.url(),
            tag = ?tag,
            "request submitted"
        );

        let job = RequestJob {
            lifecycle: Lifecycle::new(handler, executor, handle.clone(), self.registry.clone()),
            handle: handle.clone(),
            transport: self.transport.clone(),
            policy: overrides
                .retry_policy
                .unwrap_or_else(|| self.retry_policy.clone()),
            interceptor: preemptive
                .then(|| PreemptiveAuthInterceptor::new(self.credentials.clone())),
            slots: self.pool.slots(),
            deadline: timeout.map(|t| tokio::time::Instant::now() + t),
            request,
        };
        self.pool.spawn(job.run());

        Ok(handle)
    }

    /// Cancel every request tagged `tag`. Returns how many were cancelled.
    pub fn cancel_requests(&self, tag: &str, interrupt: bool) -> usize {
        self.registry.cancel_all_with(tag, interrupt)
    }

    pub fn cancel_all(&self, interrupt: bool) -> usize {
        self.registry.cancel_everything(interrupt)
    }

    /// Cancel everything, refuse new submissions and release the pool.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let cancelled = self.registry.cancel_everything(true);
        tracing::debug!(cancelled, "request context shut down");
        self.pool.close();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Credentials used by preemptive auth unless a custom store is set.
    pub fn auth_cache(&self) -> &AuthCache {
        &self.auth_cache
    }

    pub fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn worker_pool_size(&self) -> usize {
        self.pool.size()
    }

    pub fn user_agent(&self) -> &str {
        &self.config.user_agent
    }

    pub fn config(&self) -> &RequestContextConfig {
        &self.config
    }
}
