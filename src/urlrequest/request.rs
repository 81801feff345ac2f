//! Request description consumed by the dispatcher.

use crate::base::neterror::NetError;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::requestbody::{BodyEncoder, RequestBody};
use crate::http::retry::RetryPolicy;
use http::Method;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Per-request settings that take precedence over the client's.
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    pub retry_policy: Option<RetryPolicy>,
    pub preemptive_auth: Option<bool>,
    /// Deadline measured from submission.
    pub timeout: Option<Duration>,
}

/// An HTTP request: method, target, ordered headers and an encoded body.
///
/// Cloning is cheap; the body is reference counted. The dispatcher clones
/// the request once per attempt.
#[derive(Clone)]
pub struct Request {
    method: Method,
    url: String,
    headers: OrderedHeaderMap,
    body: RequestBody,
    encoder: Option<Arc<dyn BodyEncoder + Send + Sync>>,
    overrides: RequestOverrides,
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers.len())
            .field("body_len", &self.body.len())
            .field("deferred_body", &self.encoder.is_some())
            .field("overrides", &self.overrides)
            .finish()
    }
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: OrderedHeaderMap::new(),
            body: RequestBody::Empty,
            encoder: None,
            overrides: RequestOverrides::default(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Set a header, replacing earlier values of the same name.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self, NetError> {
        self.headers.insert(name, value)?;
        Ok(self)
    }

    pub fn with_headers(mut self, headers: OrderedHeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Attach an already encoded body.
    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self.encoder = None;
        self
    }

    /// Attach a body that is encoded when the request is submitted.
    pub fn with_encoder<E>(mut self, encoder: E) -> Self
    where
        E: BodyEncoder + Send + Sync + 'static,
    {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.overrides.retry_policy = Some(policy);
        self
    }

    pub fn with_preemptive_auth(mut self, enabled: bool) -> Self {
        self.overrides.preemptive_auth = Some(enabled);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.overrides.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Parse the target. Malformed targets map to `InvalidUrl`.
    pub fn parsed_url(&self) -> Result<Url, NetError> {
        Url::parse(&self.url).map_err(|_| NetError::InvalidUrl)
    }

    pub fn headers(&self) -> &OrderedHeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut OrderedHeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn overrides(&self) -> &RequestOverrides {
        &self.overrides
    }

    /// Check the target and run a deferred encoder.
    ///
    /// Called by `submit` before a handle exists. An empty target fails
    /// with `InvalidUrl`; encoder failures are reported as `Encoding`.
    pub(crate) fn prepare(&mut self) -> Result<(), NetError> {
        if self.url.trim().is_empty() {
            return Err(NetError::InvalidUrl);
        }
        if let Some(encoder) = self.encoder.take() {
            self.body = RequestBody::encode(encoder.as_ref()).map_err(|e| match e {
                e @ NetError::Encoding { .. } => e,
                other => NetError::encoding(other),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::requestbody::FormBody;
    use bytes::Bytes;

    struct FailingEncoder;

    impl BodyEncoder for FailingEncoder {
        fn content_type(&self) -> String {
            "application/octet-stream".into()
        }

        fn encode(&self) -> Result<Bytes, NetError> {
            Err(NetError::InvalidArgument)
        }
    }

    #[test]
    fn test_prepare_rejects_empty_url() {
        let mut request = Request::get("  ");
        assert!(matches!(request.prepare(), Err(NetError::InvalidUrl)));
    }

    #[test]
    fn test_prepare_runs_encoder() {
        let mut request =
            Request::post("http://example.com/").with_encoder(FormBody::new().param("a", "1"));
        request.prepare().unwrap();

        assert_eq!(request.body().data(), Bytes::from_static(b"a=1"));
        assert_eq!(
            request.body().content_type(),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn test_prepare_wraps_encoder_errors() {
        let mut request = Request::post("http://example.com/").with_encoder(FailingEncoder);
        assert!(matches!(request.prepare(), Err(NetError::Encoding { .. })));
    }

    #[test]
    fn test_parsed_url() {
        assert!(Request::get("http://example.com/x").parsed_url().is_ok());
        assert!(matches!(
            Request::get("::nope").parsed_url(),
            Err(NetError::InvalidUrl)
        ));
    }

    #[test]
    fn test_overrides() {
        let request = Request::get("http://example.com/")
            .with_preemptive_auth(true)
            .with_timeout(Duration::from_secs(2))
            .with_retry_policy(RetryPolicy::no_retry());

        assert_eq!(request.overrides().preemptive_auth, Some(true));
        assert_eq!(request.overrides().timeout, Some(Duration::from_secs(2)));
        let policy = request.overrides().retry_policy.as_ref().unwrap();
        assert_eq!(policy.get_max_retries(), 0);
    }
}
