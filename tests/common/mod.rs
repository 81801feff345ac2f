//! Shared fixtures: a scripted in-memory transport and a recording handler.

#![allow(dead_code)]

use asyncnet::http::{Executing, HttpResponse, ProgressSink, Transport};
use asyncnet::{CallbackExecutor, Client, Inline, NetError, Request, RequestHandle, ResponseHandler};
use http::{HeaderMap, StatusCode};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted transport outcome.
#[derive(Debug, Clone)]
pub enum Step {
    Status(u16),
    Body(u16, &'static str),
    Error(NetError),
    /// Report progress for each byte count, then answer 200.
    Chunks(Vec<u64>),
    Delayed(Duration, Box<Step>),
    /// Never completes.
    Hang,
    Panic,
}

impl Step {
    pub fn delayed(delay: Duration, step: Step) -> Self {
        Step::Delayed(delay, Box::new(step))
    }
}

fn response(status: u16, body: &'static str) -> HttpResponse {
    let status = StatusCode::from_u16(status).expect("valid status");
    HttpResponse::new(status, HeaderMap::new(), body)
}

async fn play(step: Step, progress: ProgressSink) -> Result<HttpResponse, NetError> {
    let mut step = step;
    loop {
        match step {
            Step::Status(code) => return Ok(response(code, "")),
            Step::Body(code, body) => return Ok(response(code, body)),
            Step::Error(e) => return Err(e),
            Step::Chunks(sizes) => {
                let total = sizes.last().copied();
                for bytes in sizes {
                    progress.report(bytes, total);
                    tokio::task::yield_now().await;
                }
                return Ok(response(200, "done"));
            }
            Step::Delayed(delay, next) => {
                tokio::time::sleep(delay).await;
                step = *next;
            }
            Step::Hang => std::future::pending::<()>().await,
            Step::Panic => panic!("scripted transport panic"),
        }
    }
}

/// Plays back a list of steps, one per call, then repeats `fallback`.
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicUsize,
    seen: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Self::with_fallback(steps, Step::Status(200))
    }

    pub fn always(step: Step) -> Arc<Self> {
        Self::with_fallback([], step)
    }

    pub fn with_fallback(steps: impl IntoIterator<Item = Step>, fallback: Step) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            fallback,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests as the transport received them, in call order.
    pub fn seen(&self) -> Vec<Request> {
        self.seen.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: Request, progress: ProgressSink) -> Executing {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request);
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        Box::pin(play(step, progress))
    }
}

/// A lifecycle event as seen by [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start,
    Progress(u64),
    Retry(usize),
    Success(u16),
    Failure(Option<u16>, i32),
    Cancel,
    Finish,
}

/// Handler that records every callback.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
    errors: Arc<Mutex<Vec<NetError>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_error(&self) -> Option<NetError> {
        self.errors.lock().unwrap().last().cloned()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl ResponseHandler for Recorder {
    fn on_start(&mut self) {
        self.push(Event::Start);
    }

    fn on_progress(&mut self, bytes: u64, _total: Option<u64>) {
        self.push(Event::Progress(bytes));
    }

    fn on_retry(&mut self, attempt: usize) {
        self.push(Event::Retry(attempt));
    }

    fn on_success(&mut self, response: HttpResponse) {
        self.push(Event::Success(response.status().as_u16()));
    }

    fn on_failure(&mut self, response: Option<HttpResponse>, error: NetError) {
        let status = response.map(|r| r.status().as_u16());
        self.push(Event::Failure(status, error.as_i32()));
        self.errors.lock().unwrap().push(error);
    }

    fn on_cancel(&mut self) {
        self.push(Event::Cancel);
    }

    fn on_finish(&mut self) {
        self.push(Event::Finish);
    }
}

/// Check `start, (progress|retry)*, terminal, finish`, or
/// `cancel, finish` for a request cancelled before it started.
pub fn assert_well_formed(events: &[Event]) {
    let terminal = |e: &Event| matches!(e, Event::Success(_) | Event::Failure(..) | Event::Cancel);
    let in_between = |e: &Event| matches!(e, Event::Progress(_) | Event::Retry(_));

    let finishes = events.iter().filter(|e| **e == Event::Finish).count();
    let terminals = events.iter().filter(|e| terminal(e)).count();
    assert_eq!(events.last(), Some(&Event::Finish), "events: {events:?}");
    assert_eq!(finishes, 1, "events: {events:?}");
    assert_eq!(terminals, 1, "events: {events:?}");

    let body = &events[..events.len() - 1];
    let (last, middle) = body.split_last().expect("terminal event");
    assert!(terminal(last), "events: {events:?}");
    if middle.is_empty() {
        return;
    }
    assert_eq!(middle[0], Event::Start, "events: {events:?}");
    assert!(middle[1..].iter().all(in_between), "events: {events:?}");
}

pub fn inline() -> Arc<dyn CallbackExecutor> {
    Arc::new(Inline)
}

/// Submit a GET whose callbacks run on the completing task.
pub fn get(client: &Client, url: &str, recorder: &Recorder) -> RequestHandle {
    client.get(url).send(recorder.clone(), inline()).unwrap()
}

pub fn fast_backoff() -> asyncnet::Backoff {
    asyncnet::Backoff::Fixed(Duration::from_millis(5))
}

/// Wait for a handle with a safety timeout.
pub async fn wait(handle: &RequestHandle) {
    tokio::time::timeout(Duration::from_secs(5), handle.finished())
        .await
        .expect("request did not finish in time");
}
