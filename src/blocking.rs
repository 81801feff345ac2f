//! Synchronous client.
//!
//! [`SyncClient::execute`] runs one request to completion on the calling
//! thread. Callbacks are delivered on that same thread, before `execute`
//! returns. Do not call it from inside an async context.

use crate::auth::authcache::AuthCache;
use crate::base::neterror::NetError;
use crate::http::retry::Backoff;
use crate::http::transport::Transport;
use crate::urlrequest::context::{RequestContext, RequestContextConfig};
use crate::urlrequest::executor::CallbackQueue;
use crate::urlrequest::handle::RequestHandle;
use crate::urlrequest::handler::ResponseHandler;
use crate::urlrequest::request::Request;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

/// Blocking client on a private current-thread runtime.
pub struct SyncClient {
    // Declared first so pending jobs are dropped before the runtime.
    context: RequestContext,
    runtime: Runtime,
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("context", &self.context)
            .finish()
    }
}

impl SyncClient {
    pub fn new() -> Result<Self, NetError> {
        Self::builder().build()
    }

    pub fn builder() -> SyncClientBuilder {
        SyncClientBuilder::default()
    }

    /// Run `request` and deliver every callback before returning.
    ///
    /// Returns the finished handle, or a submission error.
    pub fn execute<H: ResponseHandler>(
        &self,
        request: Request,
        handler: H,
    ) -> Result<RequestHandle, NetError> {
        let queue = CallbackQueue::new();
        let handle = self
            .context
            .submit(request, Box::new(handler), Arc::new(queue.clone()), None)?;
        self.runtime.block_on(queue.run_until_finished(&handle));
        Ok(handle)
    }

    pub fn get<H: ResponseHandler>(
        &self,
        url: &str,
        handler: H,
    ) -> Result<RequestHandle, NetError> {
        self.execute(Request::get(url), handler)
    }

    pub fn auth_cache(&self) -> &AuthCache {
        self.context.auth_cache()
    }
}

/// Builder for [`SyncClient`]. Mirrors the asynchronous client's options
/// that make sense on a single thread.
#[derive(Debug, Default)]
pub struct SyncClientBuilder {
    config: RequestContextConfig,
}

impl SyncClientBuilder {
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.config.backoff = backoff;
        self
    }

    pub fn preemptive_auth(mut self, enabled: bool) -> Self {
        self.config.preemptive_auth = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.config.transport = Some(Arc::new(transport));
        self
    }

    pub fn build(mut self) -> Result<SyncClient, NetError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| NetError::internal(format!("failed to start runtime: {e}")))?;
        self.config.runtime = Some(runtime.handle().clone());
        self.config.worker_pool_size = 1;
        let context = RequestContext::with_config(self.config)?;
        Ok(SyncClient { context, runtime })
    }
}
