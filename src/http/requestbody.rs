//! Encoded request bodies.
//!
//! The dispatcher never looks inside a body: it carries opaque bytes plus a
//! content-type tag. Encoding happens once, at submission, through a
//! [`BodyEncoder`]; an encoder failure is returned to the caller before any
//! request handle exists.

use crate::base::neterror::NetError;
use bytes::Bytes;

/// Request body for HTTP methods that send data.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body (GET, HEAD, DELETE).
    #[default]
    Empty,
    /// Encoded bytes with an optional content type.
    Bytes {
        data: Bytes,
        content_type: Option<String>,
    },
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::Bytes {
            data: Bytes::from(s),
            content_type: None,
        }
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(v: Vec<u8>) -> Self {
        RequestBody::Bytes {
            data: Bytes::from(v),
            content_type: None,
        }
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::Bytes {
            data: Bytes::from(s.to_owned()),
            content_type: None,
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        RequestBody::Bytes {
            data: b,
            content_type: None,
        }
    }
}

impl RequestBody {
    /// Wrap already-encoded bytes with their content type.
    pub fn with_content_type(data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        RequestBody::Bytes {
            data: data.into(),
            content_type: Some(content_type.into()),
        }
    }

    /// Run an encoder and capture its output.
    pub fn encode<E: BodyEncoder + ?Sized>(encoder: &E) -> Result<Self, NetError> {
        let data = encoder.encode()?;
        Ok(RequestBody::Bytes {
            data,
            content_type: Some(encoder.content_type()),
        })
    }

    /// Check if the body is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the length of the body in bytes.
    pub fn len(&self) -> usize {
        match self {
            RequestBody::Empty => 0,
            RequestBody::Bytes { data, .. } => data.len(),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Bytes { content_type, .. } => content_type.as_deref(),
        }
    }

    pub fn data(&self) -> Bytes {
        match self {
            RequestBody::Empty => Bytes::new(),
            RequestBody::Bytes { data, .. } => data.clone(),
        }
    }
}

/// Produces an encoded request body.
///
/// Implemented by the form, JSON and multipart encoders in this module and
/// by callers with their own formats.
pub trait BodyEncoder {
    /// Value for the `Content-Type` header.
    fn content_type(&self) -> String;

    /// Encode the body. Errors surface synchronously from `submit`.
    fn encode(&self) -> Result<Bytes, NetError>;
}

/// `application/x-www-form-urlencoded` parameters.
#[derive(Debug, Clone, Default)]
pub struct FormBody {
    pairs: Vec<(String, String)>,
}

impl FormBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter; repeated names are kept.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((name.into(), value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormBody {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl BodyEncoder for FormBody {
    fn content_type(&self) -> String {
        "application/x-www-form-urlencoded".to_string()
    }

    fn encode(&self) -> Result<Bytes, NetError> {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish();
        Ok(Bytes::from(encoded))
    }
}

/// JSON body serialized with `serde_json` at submission time.
#[cfg(feature = "json")]
pub struct JsonBody<'a, T: serde::Serialize + ?Sized>(pub &'a T);

#[cfg(feature = "json")]
impl<T: serde::Serialize + ?Sized> BodyEncoder for JsonBody<'_, T> {
    fn content_type(&self) -> String {
        "application/json".to_string()
    }

    fn encode(&self) -> Result<Bytes, NetError> {
        serde_json::to_vec(self.0)
            .map(Bytes::from)
            .map_err(NetError::encoding)
    }
}
