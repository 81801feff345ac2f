//! Ready-made handlers that decode the response body.
//!
//! Each adapter hands the decoded value to a closure. Failures, including
//! decode errors on a 2xx response, go to the adapter's error closure.
//! Cancellation is not reported as an error.

use crate::base::context::from_io_error;
use crate::base::neterror::NetError;
use crate::http::response::HttpResponse;
use crate::urlrequest::handler::ResponseHandler;
use bytes::Bytes;
use std::marker::PhantomData;
use std::path::PathBuf;

type ErrorFn = Box<dyn FnMut(Option<HttpResponse>, NetError) + Send>;
type FinishFn = Box<dyn FnMut() + Send>;

#[derive(Default)]
struct Hooks {
    error: Option<ErrorFn>,
    finish: Option<FinishFn>,
}

impl Hooks {
    fn error(&mut self, response: Option<HttpResponse>, error: NetError) {
        match &mut self.error {
            Some(f) => f(response, error),
            None => tracing::debug!(error = %error, "unhandled response error"),
        }
    }

    fn finish(&mut self) {
        if let Some(f) = &mut self.finish {
            f();
        }
    }
}

macro_rules! hook_setters {
    () => {
        /// Receive failures and decode errors.
        pub fn on_error(
            mut self,
            f: impl FnMut(Option<HttpResponse>, NetError) + Send + 'static,
        ) -> Self {
            self.hooks.error = Some(Box::new(f));
            self
        }

        pub fn on_finish(mut self, f: impl FnMut() + Send + 'static) -> Self {
            self.hooks.finish = Some(Box::new(f));
            self
        }
    };
}

/// Delivers the body as UTF-8 text.
pub struct TextResponseHandler {
    on_text: Box<dyn FnMut(HttpResponse, String) + Send>,
    hooks: Hooks,
}

impl TextResponseHandler {
    pub fn new(on_text: impl FnMut(HttpResponse, String) + Send + 'static) -> Self {
        Self {
            on_text: Box::new(on_text),
            hooks: Hooks::default(),
        }
    }

    hook_setters!();
}

impl ResponseHandler for TextResponseHandler {
    fn on_success(&mut self, response: HttpResponse) {
        match response.text() {
            Ok(text) => (self.on_text)(response, text),
            Err(e) => self.hooks.error(Some(response), e),
        }
    }

    fn on_failure(&mut self, response: Option<HttpResponse>, error: NetError) {
        self.hooks.error(response, error);
    }

    fn on_finish(&mut self) {
        self.hooks.finish();
    }
}

/// Decodes the body as JSON into `T`.
pub struct JsonResponseHandler<T> {
    on_json: Box<dyn FnMut(HttpResponse, T) + Send>,
    hooks: Hooks,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonResponseHandler<T>
where
    T: serde::de::DeserializeOwned + 'static,
{
    pub fn new(on_json: impl FnMut(HttpResponse, T) + Send + 'static) -> Self {
        Self {
            on_json: Box::new(on_json),
            hooks: Hooks::default(),
            _marker: PhantomData,
        }
    }

    hook_setters!();
}

impl<T> ResponseHandler for JsonResponseHandler<T>
where
    T: serde::de::DeserializeOwned + 'static,
{
    fn on_success(&mut self, response: HttpResponse) {
        match response.json::<T>() {
            Ok(value) => (self.on_json)(response, value),
            Err(e) => self.hooks.error(Some(response), e),
        }
    }

    fn on_failure(&mut self, response: Option<HttpResponse>, error: NetError) {
        self.hooks.error(response, error);
    }

    fn on_finish(&mut self) {
        self.hooks.finish();
    }
}

/// Accepts the raw body only for an allowed set of content types.
///
/// Patterns are exact MIME types or a `type/*` wildcard.
pub struct BinaryResponseHandler {
    allowed: Vec<String>,
    on_bytes: Box<dyn FnMut(HttpResponse, Bytes) + Send>,
    hooks: Hooks,
}

impl BinaryResponseHandler {
    pub const DEFAULT_CONTENT_TYPES: &'static [&'static str] = &[
        "application/octet-stream",
        "image/jpeg",
        "image/png",
        "image/gif",
    ];

    pub fn new(on_bytes: impl FnMut(HttpResponse, Bytes) + Send + 'static) -> Self {
        Self::with_content_types(Self::DEFAULT_CONTENT_TYPES.iter().copied(), on_bytes)
    }

    pub fn with_content_types<I, S>(
        allowed: I,
        on_bytes: impl FnMut(HttpResponse, Bytes) + Send + 'static,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed
                .into_iter()
                .map(|s| s.into().to_ascii_lowercase())
                .collect(),
            on_bytes: Box::new(on_bytes),
            hooks: Hooks::default(),
        }
    }

    hook_setters!();

    fn accepts(&self, content_type: &str) -> bool {
        self.allowed.iter().any(|pattern| match pattern.strip_suffix("/*") {
            Some(major) => content_type
                .split_once('/')
                .is_some_and(|(candidate, _)| candidate == major),
            None => pattern == content_type,
        })
    }
}

impl ResponseHandler for BinaryResponseHandler {
    fn on_success(&mut self, response: HttpResponse) {
        let allowed = response.content_type().is_some_and(|ct| self.accepts(&ct));
        if allowed {
            let body = response.body().clone();
            (self.on_bytes)(response, body);
        } else {
            tracing::debug!(content_type = ?response.content_type(), "content type not allowed");
            self.hooks.error(Some(response), NetError::InvalidResponse);
        }
    }

    fn on_failure(&mut self, response: Option<HttpResponse>, error: NetError) {
        self.hooks.error(response, error);
    }

    fn on_finish(&mut self) {
        self.hooks.finish();
    }
}

/// Writes the body to a file, then reports the path.
pub struct FileResponseHandler {
    path: PathBuf,
    append: bool,
    on_file: Box<dyn FnMut(HttpResponse, PathBuf) + Send>,
    hooks: Hooks,
}

impl FileResponseHandler {
    pub fn new(
        path: impl Into<PathBuf>,
        on_file: impl FnMut(HttpResponse, PathBuf) + Send + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            append: false,
            on_file: Box::new(on_file),
            hooks: Hooks::default(),
        }
    }

    /// Append to an existing file instead of truncating it.
    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    hook_setters!();

    fn write(&self, body: &[u8]) -> std::io::Result<()> {
        use std::io::Write;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(self.append)
            .truncate(!self.append)
            .open(&self.path)?;
        file.write_all(body)?;
        file.flush()
    }
}

impl ResponseHandler for FileResponseHandler {
    fn on_success(&mut self, response: HttpResponse) {
        match self.write(response.body()) {
            Ok(()) => {
                let path = self.path.clone();
                (self.on_file)(response, path);
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to write response body"
                );
                self.hooks.error(Some(response), from_io_error(&e));
            }
        }
    }

    fn on_failure(&mut self, response: Option<HttpResponse>, error: NetError) {
        self.hooks.error(response, error);
    }

    fn on_finish(&mut self) {
        self.hooks.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{HeaderValue, CONTENT_TYPE};
    use http::{HeaderMap, StatusCode};
    use std::sync::{Arc, Mutex};

    fn response(content_type: &str, body: &'static [u8]) -> HttpResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        HttpResponse::new(StatusCode::OK, headers, Bytes::from_static(body))
    }

    #[test]
    fn test_text_invalid_utf8_is_error() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let mut handler = TextResponseHandler::new(|_, _| panic!("not text"))
            .on_error(move |_, e| sink.lock().unwrap().push(e.as_i32()));

        handler.on_success(response("text/plain", &[0xff, 0xfe]));

        assert_eq!(
            *errors.lock().unwrap(),
            vec![NetError::InvalidUtf8.as_i32()]
        );
    }

    #[test]
    fn test_binary_wildcard() {
        let handler = BinaryResponseHandler::with_content_types(["image/*"], |_, _| {});
        assert!(handler.accepts("image/webp"));
        assert!(!handler.accepts("text/html"));
    }

    #[test]
    fn test_binary_rejects_unlisted_type() {
        let got = Arc::new(Mutex::new(None));
        let sink = got.clone();
        let mut handler = BinaryResponseHandler::new(|_, _| panic!("should be rejected"))
            .on_error(move |resp, e| {
                *sink.lock().unwrap() = Some((resp.is_some(), e.as_i32()));
            });

        handler.on_success(response("text/html; charset=utf-8", b"<html>"));

        assert_eq!(
            *got.lock().unwrap(),
            Some((true, NetError::InvalidResponse.as_i32()))
        );
    }

    #[test]
    fn test_file_handler_writes_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.bin");
        let saved = Arc::new(Mutex::new(None));
        let sink = saved.clone();
        let mut handler = FileResponseHandler::new(&path, move |_, p| {
            *sink.lock().unwrap() = Some(p);
        });

        handler.on_success(response("application/octet-stream", b"payload"));

        assert_eq!(saved.lock().unwrap().as_deref(), Some(path.as_path()));
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
    }
}
