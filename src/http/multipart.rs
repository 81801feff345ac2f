//! Multipart form data support.
//!
//! Provides RFC 2046 multipart/form-data encoding for file uploads.
//! File parts are read when the form is encoded, so a missing or unreadable
//! file is reported as an encoding error at submission.
//!
//! # Example
//! ```ignore
//! use asyncnet::http::multipart::{Form, Part};
//!
//! let form = Form::new()
//!     .text("username", "user123")
//!     .part("avatar", Part::file("/tmp/me.png").content_type("image/png"));
//!
//! client.post("http://example.com/upload").multipart(&form).send(handler, executor)?;
//! ```

use crate::base::neterror::NetError;
use crate::http::requestbody::BodyEncoder;
use bytes::Bytes;
use std::borrow::Cow;
use std::path::PathBuf;

/// A multipart form for file uploads.
#[derive(Debug, Clone)]
pub struct Form {
    boundary: String,
    fields: Vec<(Cow<'static, str>, Part)>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create a new empty form.
    pub fn new() -> Self {
        Self {
            boundary: generate_boundary(),
            fields: Vec::new(),
        }
    }

    /// Get the boundary string.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Add a text field.
    pub fn text<N, V>(self, name: N, value: V) -> Self
    where
        N: Into<Cow<'static, str>>,
        V: Into<Cow<'static, str>>,
    {
        self.part(name, Part::text(value))
    }

    /// Add a custom part.
    pub fn part<N>(mut self, name: N, part: Part) -> Self
    where
        N: Into<Cow<'static, str>>,
    {
        self.fields.push((name.into(), part));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn write_part(&self, output: &mut Vec<u8>, name: &str, part: &Part, data: &[u8]) {
        // --boundary\r\n
        output.extend_from_slice(b"--");
        output.extend_from_slice(self.boundary.as_bytes());
        output.extend_from_slice(b"\r\n");

        output.extend_from_slice(part.format_headers(name).as_bytes());
        output.extend_from_slice(b"\r\n\r\n");

        output.extend_from_slice(data);
        output.extend_from_slice(b"\r\n");
    }
}

impl BodyEncoder for Form {
    fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    fn encode(&self) -> Result<Bytes, NetError> {
        if self.fields.is_empty() {
            return Ok(Bytes::new());
        }

        let mut output = Vec::new();
        for (name, part) in &self.fields {
            match &part.source {
                Source::Memory(data) => self.write_part(&mut output, name, part, data),
                Source::File(path) => {
                    let data = std::fs::read(path).map_err(|e| {
                        NetError::encoding(format!("reading {}: {}", path.display(), e))
                    })?;
                    self.write_part(&mut output, name, part, &data);
                }
            }
        }

        // Final boundary
        output.extend_from_slice(b"--");
        output.extend_from_slice(self.boundary.as_bytes());
        output.extend_from_slice(b"--\r\n");

        Ok(Bytes::from(output))
    }
}

#[derive(Debug, Clone)]
enum Source {
    Memory(Bytes),
    File(PathBuf),
}

/// A part of a multipart form.
#[derive(Debug, Clone)]
pub struct Part {
    source: Source,
    content_type: Option<String>,
    file_name: Option<Cow<'static, str>>,
}

impl Part {
    /// Create a text part.
    pub fn text<V>(value: V) -> Self
    where
        V: Into<Cow<'static, str>>,
    {
        Self {
            source: Source::Memory(Bytes::from(value.into().into_owned())),
            content_type: Some("text/plain; charset=utf-8".to_string()),
            file_name: None,
        }
    }

    /// Create a part from bytes.
    pub fn bytes<B>(data: B) -> Self
    where
        B: Into<Bytes>,
    {
        Self {
            source: Source::Memory(data.into()),
            content_type: None,
            file_name: None,
        }
    }

    /// Create a part read from a file when the form is encoded.
    ///
    /// The file name defaults to the last path component and the content
    /// type to `application/octet-stream`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| Cow::Owned(name.to_string_lossy().into_owned()));
        Self {
            source: Source::File(path),
            content_type: Some("application/octet-stream".to_string()),
            file_name,
        }
    }

    /// Set the content type.
    pub fn content_type<S: Into<String>>(mut self, mime: S) -> Self {
        self.content_type = Some(mime.into());
        self
    }

    /// Set the file name.
    pub fn file_name<S>(mut self, name: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        self.file_name = Some(name.into());
        self
    }

    fn format_headers(&self, name: &str) -> String {
        let mut header = format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_quotes(name)
        );

        if let Some(ref filename) = self.file_name {
            header.push_str(&format!("; filename=\"{}\"", escape_quotes(filename)));
        }

        if let Some(ref mime) = self.content_type {
            header.push_str(&format!("\r\nContent-Type: {}", mime));
        }

        header
    }
}

/// Escape quotes and backslashes in a string.
fn escape_quotes(s: &str) -> Cow<'_, str> {
    if s.contains('"') || s.contains('\\') || s.contains('\r') || s.contains('\n') {
        Cow::Owned(
            s.replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\r', "\\r")
                .replace('\n', "\\n"),
        )
    } else {
        Cow::Borrowed(s)
    }
}

fn generate_boundary() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let sequence = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!(
        "----asyncnet-boundary-{:016x}{:08x}{:04x}",
        nanos,
        std::process::id(),
        sequence
    )
}
