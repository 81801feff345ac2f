use http::StatusCode;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Broad category of a [`NetError`].
///
/// The dispatcher routes on this: `Cancellation` always ends in `on_cancel`,
/// `Encoding` is only ever returned synchronously from `submit`, everything
/// else reaches the handler through `on_failure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection or IO failure while talking to the peer.
    Transport,
    /// The peer answered with something that is not valid HTTP.
    Protocol,
    /// The request itself can never succeed (bad URL, unsupported scheme).
    InvalidRequest,
    /// A complete response with a non-2xx status.
    Status,
    /// Caller-initiated cancellation or timeout.
    Cancellation,
    /// The retry policy ran out of attempts.
    RetryExhausted,
    /// Body construction failed before submission.
    Encoding,
    /// Failure inside the client itself.
    Internal,
}

#[derive(Debug, Error, Clone)]
pub enum NetError {
    // Generic
    #[error("Request failed")]
    Failed,
    #[error("Request aborted")]
    Aborted,
    #[error("Invalid argument")]
    InvalidArgument,

    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection aborted")]
    ConnectionAborted,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("Internet disconnected")]
    InternetDisconnected,
    #[error("Address invalid")]
    AddressInvalid,
    #[error("Address unreachable")]
    AddressUnreachable,
    #[error("Socket not connected")]
    SocketNotConnected,
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("Network access denied")]
    NetworkAccessDenied,
    #[error("Address in use")]
    AddressInUse,

    // Connection errors with context
    #[error("Connection to {host}:{port} failed: {source}")]
    ConnectionFailedTo {
        host: String,
        port: u16,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("Name {domain} not resolved: {source}")]
    NameNotResolvedFor {
        domain: String,
        #[source]
        source: Arc<io::Error>,
    },

    // HTTP Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Disallowed URL scheme")]
    DisallowedUrlScheme,
    #[error("Unknown URL scheme")]
    UnknownUrlScheme,
    #[error("Invalid response")]
    InvalidResponse,
    #[error("Invalid chunked encoding")]
    InvalidChunkedEncoding,
    #[error("Method not supported")]
    MethodNotSupported,
    #[error("Empty response")]
    EmptyResponse,
    #[error("Response headers too big")]
    ResponseHeadersTooBig,
    #[error("Content-Length mismatch")]
    ContentLengthMismatch,
    #[error("Invalid HTTP response")]
    InvalidHttpResponse,
    #[error("Too many retries ({attempts} attempts), last error: {last}")]
    TooManyRetries {
        attempts: usize,
        last: Box<NetError>,
    },

    // Client errors (custom codes starting at -900)
    #[error("Invalid header")]
    InvalidHeader,
    #[error("Response body read failed")]
    HttpBodyError,
    #[error("Response body is not valid UTF-8")]
    InvalidUtf8,
    #[error("Response body is not valid JSON: {reason}")]
    JsonParseError { reason: String },
    #[error("HTTP status {0}")]
    HttpStatus(StatusCode),
    #[error("Request body encoding failed: {reason}")]
    Encoding { reason: String },
    #[error("Client has been shut down")]
    ClientShutdown,
    #[error("Internal error: {reason}")]
    Internal { reason: String },

    #[error("Unknown error: {0}")]
    Unknown(i32),
}

impl NetError {
    /// Build an [`NetError::Encoding`] from any displayable reason.
    pub fn encoding(reason: impl std::fmt::Display) -> Self {
        NetError::Encoding {
            reason: reason.to_string(),
        }
    }

    /// Build an [`NetError::Internal`] from any displayable reason.
    pub fn internal(reason: impl std::fmt::Display) -> Self {
        NetError::Internal {
            reason: reason.to_string(),
        }
    }

    pub fn connection_failed_to(host: &str, port: u16, source: io::Error) -> Self {
        NetError::ConnectionFailedTo {
            host: host.to_string(),
            port,
            source: Arc::new(source),
        }
    }

    pub fn dns_failed(domain: &str, source: io::Error) -> Self {
        NetError::NameNotResolvedFor {
            domain: domain.to_string(),
            source: Arc::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NetError::Aborted => ErrorKind::Cancellation,

            NetError::ConnectionClosed
            | NetError::ConnectionReset
            | NetError::ConnectionRefused
            | NetError::ConnectionAborted
            | NetError::ConnectionFailed
            | NetError::NameNotResolved
            | NetError::InternetDisconnected
            | NetError::AddressInvalid
            | NetError::AddressUnreachable
            | NetError::SocketNotConnected
            | NetError::ConnectionTimedOut
            | NetError::NetworkAccessDenied
            | NetError::AddressInUse
            | NetError::ConnectionFailedTo { .. }
            | NetError::NameNotResolvedFor { .. }
            | NetError::EmptyResponse => ErrorKind::Transport,

            NetError::InvalidResponse
            | NetError::InvalidChunkedEncoding
            | NetError::ResponseHeadersTooBig
            | NetError::ContentLengthMismatch
            | NetError::InvalidHttpResponse
            | NetError::HttpBodyError
            | NetError::InvalidUtf8
            | NetError::JsonParseError { .. } => ErrorKind::Protocol,

            NetError::InvalidArgument
            | NetError::InvalidUrl
            | NetError::DisallowedUrlScheme
            | NetError::UnknownUrlScheme
            | NetError::MethodNotSupported
            | NetError::InvalidHeader => ErrorKind::InvalidRequest,

            NetError::HttpStatus(_) => ErrorKind::Status,
            NetError::TooManyRetries { .. } => ErrorKind::RetryExhausted,
            NetError::Encoding { .. } => ErrorKind::Encoding,

            NetError::Failed
            | NetError::ClientShutdown
            | NetError::Internal { .. }
            | NetError::Unknown(_) => ErrorKind::Internal,
        }
    }

    /// True for failures that happen before any byte of the request is
    /// written, so even a non-idempotent request cannot have reached the
    /// server.
    pub fn is_before_send(&self) -> bool {
        matches!(
            self,
            NetError::ConnectionRefused
                | NetError::ConnectionFailed
                | NetError::NameNotResolved
                | NetError::InternetDisconnected
                | NetError::AddressInvalid
                | NetError::AddressUnreachable
                | NetError::NetworkAccessDenied
                | NetError::ConnectionFailedTo { .. }
                | NetError::NameNotResolvedFor { .. }
        )
    }

    pub fn is_cancellation(&self) -> bool {
        self.kind() == ErrorKind::Cancellation
    }

    /// The response status, for [`NetError::HttpStatus`].
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            NetError::HttpStatus(status) => Some(*status),
            NetError::TooManyRetries { last, .. } => last.status(),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::Failed => -2,
            NetError::Aborted => -3,
            NetError::InvalidArgument => -4,

            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionAborted => -103,
            NetError::ConnectionFailed => -104,
            NetError::NameNotResolved => -105,
            NetError::InternetDisconnected => -106,
            NetError::AddressInvalid => -108,
            NetError::AddressUnreachable => -109,
            NetError::SocketNotConnected => -112,
            NetError::ConnectionTimedOut => -118,
            NetError::NetworkAccessDenied => -138,
            NetError::AddressInUse => -147,
            NetError::ConnectionFailedTo { .. } => -104,
            NetError::NameNotResolvedFor { .. } => -105,

            NetError::InvalidUrl => -300,
            NetError::DisallowedUrlScheme => -301,
            NetError::UnknownUrlScheme => -302,
            NetError::InvalidResponse => -320,
            NetError::InvalidChunkedEncoding => -321,
            NetError::MethodNotSupported => -322,
            NetError::EmptyResponse => -324,
            NetError::ResponseHeadersTooBig => -325,
            NetError::ContentLengthMismatch => -354,
            NetError::InvalidHttpResponse => -370,
            NetError::TooManyRetries { .. } => -375,

            NetError::InvalidHeader => -1000,
            NetError::HttpBodyError => -1001,
            NetError::InvalidUtf8 => -1002,
            NetError::JsonParseError { .. } => -1003,
            NetError::HttpStatus(_) => -1004,
            NetError::Encoding { .. } => -1005,
            NetError::ClientShutdown => -1006,
            NetError::Internal { .. } => -1007,
            NetError::Unknown(code) => *code,
        }
    }
}

/// Decodes a numeric code.
///
/// Variants that carry context decode to their context-free counterpart
/// (`-104` is always `ConnectionFailed`); codes whose variant cannot be
/// rebuilt without context decode to [`NetError::Unknown`].
impl From<i32> for NetError {
    fn from(code: i32) -> Self {
        match code {
            -2 => NetError::Failed,
            -3 => NetError::Aborted,
            -4 => NetError::InvalidArgument,

            -100 => NetError::ConnectionClosed,
            -101 => NetError::ConnectionReset,
            -102 => NetError::ConnectionRefused,
            -103 => NetError::ConnectionAborted,
            -104 => NetError::ConnectionFailed,
            -105 => NetError::NameNotResolved,
            -106 => NetError::InternetDisconnected,
            -108 => NetError::AddressInvalid,
            -109 => NetError::AddressUnreachable,
            -112 => NetError::SocketNotConnected,
            -118 => NetError::ConnectionTimedOut,
            -138 => NetError::NetworkAccessDenied,
            -147 => NetError::AddressInUse,

            -300 => NetError::InvalidUrl,
            -301 => NetError::DisallowedUrlScheme,
            -302 => NetError::UnknownUrlScheme,
            -320 => NetError::InvalidResponse,
            -321 => NetError::InvalidChunkedEncoding,
            -322 => NetError::MethodNotSupported,
            -324 => NetError::EmptyResponse,
            -325 => NetError::ResponseHeadersTooBig,
            -354 => NetError::ContentLengthMismatch,
            -370 => NetError::InvalidHttpResponse,

            -1000 => NetError::InvalidHeader,
            -1001 => NetError::HttpBodyError,
            -1002 => NetError::InvalidUtf8,
            -1006 => NetError::ClientShutdown,
            _ => NetError::Unknown(code),
        }
    }
}
