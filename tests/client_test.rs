//! Tests for Client API.

mod common;

use asyncnet::http::multipart::{Form, Part};
use asyncnet::http::FormBody;
use asyncnet::{CallbackQueue, Client, Inline, NetError, RequestBuilder};
use common::{inline, wait, Event, Recorder, ScriptedTransport, Step};
use std::sync::Arc;
use std::time::Duration;

fn client(transport: Arc<ScriptedTransport>) -> Client {
    Client::builder().transport(transport).build().unwrap()
}

// === Client Tests ===

#[tokio::test]
async fn test_client_creation() {
    let client = Client::new().unwrap();
    assert!(!client.is_shut_down());
    assert_eq!(client.active_requests(), 0);
}

#[test]
fn test_client_outside_runtime_owns_one() {
    let transport = ScriptedTransport::new([Step::Status(200)]);
    let client = client(transport.clone());
    let queue = CallbackQueue::new();
    let recorder = Recorder::new();

    let handle = client
        .get("http://example.com/")
        .send(recorder.clone(), Arc::new(queue.clone()))
        .unwrap();
    queue.blocking_run_until_finished(&handle);

    assert_eq!(
        recorder.events(),
        vec![Event::Start, Event::Success(200), Event::Finish]
    );
    client.shutdown();
}

#[tokio::test]
async fn test_client_request_methods() {
    let transport = ScriptedTransport::new([]);
    let client = client(transport.clone());
    let send = |builder: RequestBuilder| builder.send(Recorder::new(), inline()).unwrap();

    let handles = vec![
        send(client.get("http://example.com/")),
        send(client.post("http://example.com/")),
        send(client.put("http://example.com/")),
        send(client.delete("http://example.com/")),
        send(client.head("http://example.com/")),
        send(client.patch("http://example.com/")),
    ];
    for handle in &handles {
        wait(handle).await;
    }

    let mut methods: Vec<String> = transport
        .seen()
        .iter()
        .map(|r| r.method().to_string())
        .collect();
    methods.sort();
    assert_eq!(
        methods,
        vec!["DELETE", "GET", "HEAD", "PATCH", "POST", "PUT"]
    );
}

#[tokio::test]
async fn test_request_builder_headers_keep_order() {
    let client = Client::new().unwrap();
    let request = client
        .get("http://example.com/")
        .header("X-First", "1")
        .append_header("Accept", "text/html")
        .append_header("Accept", "application/json")
        .build()
        .unwrap();

    let names: Vec<&str> = request.headers().iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["x-first", "accept", "accept"]);
}

#[tokio::test]
async fn test_request_builder_form_encoded_at_send() {
    let transport = ScriptedTransport::new([Step::Status(200)]);
    let client = client(transport.clone());

    let handle = client
        .post("http://example.com/login")
        .form(FormBody::new().param("user", "a b").param("pass", "x&y"))
        .send(Recorder::new(), Arc::new(Inline))
        .unwrap();
    wait(&handle).await;

    let body = transport.seen()[0].body().clone();
    assert_eq!(&body.data()[..], b"user=a+b&pass=x%26y");
    assert_eq!(
        body.content_type(),
        Some("application/x-www-form-urlencoded")
    );
}

#[tokio::test]
async fn test_request_builder_multipart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("note.txt");
    std::fs::write(&path, "file contents").unwrap();

    let transport = ScriptedTransport::new([Step::Status(200)]);
    let client = client(transport.clone());
    let form = Form::new()
        .text("title", "hello")
        .part("doc", Part::file(&path));

    let handle = client
        .post("http://example.com/upload")
        .multipart(form)
        .send(Recorder::new(), Arc::new(Inline))
        .unwrap();
    wait(&handle).await;

    let request = &transport.seen()[0];
    let content_type = request.body().content_type().unwrap().to_string();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let body = String::from_utf8(request.body().data().to_vec()).unwrap();
    assert!(body.contains("file contents"));
    assert!(body.contains("name=\"title\""));
}

#[tokio::test]
async fn test_request_builder_rejects_bad_header_at_send() {
    let client = Client::new().unwrap();
    let result = client
        .get("http://example.com/")
        .header("X-Bad", "line\nbreak")
        .send(Recorder::new(), Arc::new(Inline));

    assert!(matches!(result, Err(NetError::InvalidHeader)));
}

#[tokio::test]
async fn test_client_clone_shares_registry() {
    let client = client(ScriptedTransport::new([Step::Hang]));
    let cloned = client.clone();

    let handle = client
        .get("http://example.com/")
        .tag("shared")
        .send(Recorder::new(), Arc::new(Inline))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(cloned.cancel_requests("shared", true), 1);
    wait(&handle).await;
}

#[tokio::test]
async fn test_client_timeout_override_per_request() {
    let transport = ScriptedTransport::new([Step::Hang]);
    let client = Client::builder()
        .transport(transport)
        .timeout(Duration::from_secs(60))
        .build()
        .unwrap();
    let recorder = Recorder::new();

    let handle = client
        .get("http://example.com/")
        .timeout(Duration::from_millis(20))
        .send(recorder.clone(), Arc::new(Inline))
        .unwrap();
    wait(&handle).await;

    assert_eq!(
        recorder.events(),
        vec![Event::Start, Event::Cancel, Event::Finish]
    );
}
