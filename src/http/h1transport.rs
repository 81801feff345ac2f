//! Plain HTTP/1.1 transport over a fresh TCP connection per attempt.
//!
//! DNS → TCP → HTTP/1.1 handshake → request → buffered response. There is
//! no TLS and no connection reuse; `https` URLs fail with
//! `UnknownUrlScheme` so a real transport can be plugged in instead.

use crate::base::context::{from_io_error, IoResultExt};
use crate::base::neterror::NetError;
use crate::http::response::HttpResponse;
use crate::http::transport::{Executing, ProgressSink, Transport};
use crate::urlrequest::request::Request;
use bytes::{Bytes, BytesMut};
use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, HOST};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::error::Error as _;
use tokio::net::{lookup_host, TcpStream};
use url::{Position, Url};

/// HTTP/1.1 transport built on `hyper`'s connection API.
#[derive(Debug, Clone, Default)]
pub struct H1Transport {
    _private: (),
}

impl H1Transport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for H1Transport {
    fn execute(&self, request: Request, progress: ProgressSink) -> Executing {
        Box::pin(async move { round_trip(request, progress).await })
    }
}

async fn connect(url: &Url) -> Result<TcpStream, NetError> {
    let host = url.host_str().ok_or(NetError::InvalidUrl)?;
    let port = url.port_or_known_default().ok_or(NetError::InvalidUrl)?;

    let addrs = lookup_host((host, port)).await.dns_context(host)?;

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                tracing::debug!(%addr, "connected");
                return Ok(stream);
            }
            Err(e) => last_error = Some(e),
        }
    }

    match last_error {
        Some(e) => Err::<TcpStream, _>(e).connection_context(host, port),
        None => Err(NetError::NameNotResolved),
    }
}

async fn round_trip(request: Request, progress: ProgressSink) -> Result<HttpResponse, NetError> {
    let url = request.parsed_url()?;
    if url.scheme() != "http" {
        return Err(NetError::UnknownUrlScheme);
    }

    let stream = connect(&url).await?;
    let (mut sender, conn) = http1::handshake(TokioIo::new(stream))
        .await
        .map_err(map_hyper_error)?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!(error = %e, "connection driver ended with error");
        }
    });

    let body = request.body().data();
    let content_type = request.body().content_type().map(str::to_owned);
    let mut headers = request.headers().clone();

    if !headers.contains("host") {
        let host = match url.port() {
            Some(port) => format!("{}:{}", url.host_str().unwrap_or_default(), port),
            None => url.host_str().unwrap_or_default().to_string(),
        };
        headers.insert_typed(
            HOST,
            HeaderValue::from_str(&host).map_err(|_| NetError::InvalidUrl)?,
        );
    }
    if let Some(content_type) = content_type {
        if !headers.contains("content-type") {
            headers.insert_typed(
                CONTENT_TYPE,
                HeaderValue::from_str(&content_type).map_err(|_| NetError::InvalidHeader)?,
            );
        }
    }

    let mut req = http::Request::builder()
        .method(request.method().clone())
        .uri(&url[Position::BeforePath..])
        .body(Full::new(body))
        .map_err(|_| NetError::InvalidUrl)?;
    *req.headers_mut() = headers.to_header_map();

    let response = sender.send_request(req).await.map_err(map_hyper_error)?;
    let (parts, mut incoming) = response.into_parts();

    let total = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let mut buffer = BytesMut::new();
    while let Some(frame) = incoming.frame().await {
        let frame = frame.map_err(map_hyper_error)?;
        if let Ok(data) = frame.into_data() {
            buffer.extend_from_slice(&data);
            progress.report(buffer.len() as u64, total);
        }
    }

    let body: Bytes = buffer.freeze();
    Ok(HttpResponse::from_parts(parts, body))
}

fn map_hyper_error(error: hyper::Error) -> NetError {
    if let Some(io) = error
        .source()
        .and_then(|s| s.downcast_ref::<std::io::Error>())
    {
        return from_io_error(io);
    }
    if error.is_parse() || error.is_parse_status() {
        NetError::InvalidHttpResponse
    } else if error.is_incomplete_message() {
        NetError::EmptyResponse
    } else if error.is_canceled() {
        NetError::ConnectionAborted
    } else if error.is_closed() {
        NetError::ConnectionClosed
    } else if error.is_timeout() {
        NetError::ConnectionTimedOut
    } else {
        tracing::debug!(error = %error, "unclassified hyper error");
        NetError::Failed
    }
}
