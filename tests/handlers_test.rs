//! Ready-made handlers driven through the client.

mod common;

use asyncnet::http::{Executing, HttpResponse, ProgressSink, Transport};
use asyncnet::{
    BinaryResponseHandler, Client, FileResponseHandler, FnHandler, Inline, JsonResponseHandler,
    NetError, Request, RequestHandle, ResponseHandler, SerialExecutor, TextResponseHandler,
};
use common::wait;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use serde::Deserialize;
use std::sync::{Arc, Mutex};

/// Answers every request with a fixed content type and body.
struct Fixed {
    content_type: &'static str,
    body: &'static str,
}

impl Transport for Fixed {
    fn execute(&self, _request: Request, _progress: ProgressSink) -> Executing {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(self.content_type));
        let response = HttpResponse::new(StatusCode::OK, headers, self.body);
        Box::pin(async move { Ok(response) })
    }
}

fn client(content_type: &'static str, body: &'static str) -> Client {
    Client::builder()
        .transport(Fixed { content_type, body })
        .build()
        .unwrap()
}

fn get_with<H: ResponseHandler>(client: &Client, url: &str, handler: H) -> RequestHandle {
    client.get(url).send(handler, Arc::new(Inline)).unwrap()
}

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u32,
    name: String,
}

#[tokio::test]
async fn test_text_handler() {
    let client = client("text/plain", "hello world");
    let got = Arc::new(Mutex::new(String::new()));
    let sink = got.clone();

    let handler = TextResponseHandler::new(move |_, text| *sink.lock().unwrap() = text);
    let handle = get_with(&client, "http://example.com/", handler);
    wait(&handle).await;

    assert_eq!(*got.lock().unwrap(), "hello world");
}

#[tokio::test]
async fn test_json_handler_decodes() {
    let client = client("application/json", r#"{"id": 7, "name": "ada"}"#);
    let got = Arc::new(Mutex::new(None));
    let sink = got.clone();

    let handler = JsonResponseHandler::<User>::new(move |_, user| {
        *sink.lock().unwrap() = Some(user);
    });
    let handle = get_with(&client, "http://example.com/user", handler);
    wait(&handle).await;

    let expected = User {
        id: 7,
        name: "ada".into(),
    };
    assert_eq!(*got.lock().unwrap(), Some(expected));
}

#[tokio::test]
async fn test_json_handler_decode_error_goes_to_on_error() {
    let client = client("application/json", "not json");
    let got = Arc::new(Mutex::new(None));
    let sink = got.clone();
    let finished = Arc::new(Mutex::new(false));
    let done = finished.clone();

    let handler = JsonResponseHandler::<User>::new(|_, _| panic!("should not decode"))
        .on_error(move |response, error| {
            *sink.lock().unwrap() = Some((response.map(|r| r.status()), error));
        })
        .on_finish(move || *done.lock().unwrap() = true);
    let handle = get_with(&client, "http://example.com/user", handler);
    wait(&handle).await;

    let (status, error) = got.lock().unwrap().take().unwrap();
    assert_eq!(status, Some(StatusCode::OK));
    assert!(matches!(error, NetError::JsonParseError { .. }));
    assert!(*finished.lock().unwrap());
}

#[tokio::test]
async fn test_binary_handler_checks_content_type() {
    let accepted = Arc::new(Mutex::new(Vec::new()));
    let sink = accepted.clone();
    let png = client("image/png", "PNGDATA");
    let handler = BinaryResponseHandler::new(move |_, bytes| {
        sink.lock().unwrap().extend_from_slice(&bytes);
    });
    let handle = get_with(&png, "http://example.com/a.png", handler);
    wait(&handle).await;
    assert_eq!(&accepted.lock().unwrap()[..], b"PNGDATA");

    let rejected = Arc::new(Mutex::new(None));
    let sink = rejected.clone();
    let html = client("text/html", "<html/>");
    let handler = BinaryResponseHandler::new(|_, _| panic!("html is not allowed"))
        .on_error(move |_, error| {
            *sink.lock().unwrap() = Some(error.as_i32());
        });
    let handle = get_with(&html, "http://example.com/a.png", handler);
    wait(&handle).await;
    assert_eq!(
        *rejected.lock().unwrap(),
        Some(NetError::InvalidResponse.as_i32())
    );
}

#[tokio::test]
async fn test_file_handler_writes_download() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("download.bin");
    let client = client("application/octet-stream", "0123456789");
    let saved = Arc::new(Mutex::new(None));
    let sink = saved.clone();

    let handler = FileResponseHandler::new(&path, move |_, p| *sink.lock().unwrap() = Some(p));
    let handle = get_with(&client, "http://example.com/file", handler);
    wait(&handle).await;

    assert_eq!(saved.lock().unwrap().as_deref(), Some(path.as_path()));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "0123456789");
}

#[tokio::test]
async fn test_fn_handler_on_serial_executor() {
    let client = client("text/plain", "ok");
    let log = Arc::new(Mutex::new(Vec::new()));
    let (a, b, c) = (log.clone(), log.clone(), log.clone());

    let handler = FnHandler::new()
        .start(move || a.lock().unwrap().push("start"))
        .success(move |_| b.lock().unwrap().push("success"))
        .finish(move || c.lock().unwrap().push("finish"));
    let executor = Arc::new(SerialExecutor::new());
    let handle = client
        .get("http://example.com/")
        .send(handler, executor)
        .unwrap();
    wait(&handle).await;

    assert_eq!(*log.lock().unwrap(), vec!["start", "success", "finish"]);
}

#[tokio::test]
async fn test_panicking_handler_still_finishes() {
    let client = client("text/plain", "ok");
    let finished = Arc::new(Mutex::new(false));
    let done = finished.clone();

    let handler = FnHandler::new()
        .success(|_| panic!("handler bug"))
        .finish(move || *done.lock().unwrap() = true);
    let handle = get_with(&client, "http://example.com/", handler);
    wait(&handle).await;

    assert!(*finished.lock().unwrap());
    assert_eq!(client.active_requests(), 0);
}
