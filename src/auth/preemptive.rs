//! Speculative credentials on the first round trip.
//!
//! Sending `Authorization` before the server asks for it saves the
//! 401-then-retry exchange on every authenticated request, at the cost of
//! sending credentials to a host that may not need them. The interceptor
//! only does this for hosts the credential store already knows.

use crate::auth::authcache::CredentialStore;
use crate::urlrequest::request::Request;
use http::header::{HeaderValue, AUTHORIZATION};
use std::sync::Arc;

/// Attaches cached credentials to a request before it is first sent.
#[derive(Clone)]
pub struct PreemptiveAuthInterceptor {
    store: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for PreemptiveAuthInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreemptiveAuthInterceptor")
            .finish_non_exhaustive()
    }
}

impl PreemptiveAuthInterceptor {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Add `Authorization` to `request` if credentials exist for its host.
    ///
    /// Does nothing when the request already carries `Authorization`, when
    /// a challenge has already been seen for it, or when the URL has no
    /// host. Returns whether a header was attached.
    pub fn intercept(&self, request: &mut Request, challenged: bool) -> bool {
        if challenged || request.headers().contains("authorization") {
            return false;
        }

        let Ok(url) = request.parsed_url() else {
            return false;
        };
        let (Some(host), Some(port)) = (url.host_str(), url.port_or_known_default()) else {
            return false;
        };

        let Some(entry) = self.store.lookup(host, port) else {
            return false;
        };

        match HeaderValue::from_str(&entry.to_header_value()) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert_typed(AUTHORIZATION, value);
                tracing::debug!(
                    host = %host,
                    port,
                    scheme = ?entry.scheme,
                    "attached preemptive credentials"
                );
                true
            }
            Err(_) => {
                tracing::warn!(
                    host = %host,
                    port,
                    "stored credentials are not a valid header value"
                );
                false
            }
        }
    }
}
