// In-process stand-in for the recognition server
//
// Speaks the same JSON endpoints as the real server. Frame numbers are issued
// per session in arrival order unless the frame's decoded text is "<n>" or
// "<n>@<delay_ms>", which forces frame number n (and delays the reply).

#![allow(dead_code)]

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use base64::Engine;
use serde_json::{json, Value};
use sign_session::{ServerConfig, SessionClient};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower_http::trace::TraceLayer;

pub const RECORDINGS: &str = "/recordings";
pub const START: &str = "/start-recording";
pub const PROCESS_FRAME: &str = "/process-frame";
pub const STOP: &str = "/stop-recording";

#[derive(Default)]
struct Inner {
    /// session_id → next frame number
    sessions: HashMap<String, u64>,
    finished: Vec<Value>,
    hits: HashMap<&'static str, usize>,
    frames: Vec<Value>,
    start_bodies: Vec<Value>,
    failures: HashMap<&'static str, (u16, String)>,
    fixed_session_id: Option<String>,
    frame_delay: Duration,
    slow_stops: usize,
    slow_stop_delay: Duration,
}

#[derive(Clone, Default)]
pub struct MockServer {
    inner: Arc<Mutex<Inner>>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to an ephemeral port and serve in the background; returns the base URL
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route(RECORDINGS, get(list_recordings))
            .route(START, post(start_recording))
            .route(PROCESS_FRAME, post(process_frame))
            .route(STOP, post(stop_recording))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }

    /// Issue this ID for every started session
    pub fn with_session_id(self, session_id: &str) -> Self {
        self.inner.lock().unwrap().fixed_session_id = Some(session_id.to_string());
        self
    }

    /// Answer every request to `path` with `status` and `body`
    pub fn fail(&self, path: &'static str, status: u16, body: &str) {
        self.inner
            .lock()
            .unwrap()
            .failures
            .insert(path, (status, body.to_string()));
    }

    pub fn recover(&self, path: &'static str) {
        self.inner.lock().unwrap().failures.remove(path);
    }

    /// Delay every process-frame reply
    pub fn set_frame_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().frame_delay = delay;
    }

    /// Hold the next `count` stop replies for `delay`
    pub fn slow_stops(&self, count: usize, delay: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.slow_stops = count;
        inner.slow_stop_delay = delay;
    }

    pub fn hits(&self, path: &str) -> usize {
        self.inner.lock().unwrap().hits.get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.inner.lock().unwrap().hits.values().sum()
    }

    /// Bodies received on /process-frame, in arrival order
    pub fn frames(&self) -> Vec<Value> {
        self.inner.lock().unwrap().frames.clone()
    }

    pub fn start_bodies(&self) -> Vec<Value> {
        self.inner.lock().unwrap().start_bodies.clone()
    }

    pub fn open_sessions(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    fn record_hit(&self, path: &'static str) -> Option<Response> {
        let mut inner = self.inner.lock().unwrap();
        *inner.hits.entry(path).or_insert(0) += 1;
        inner.failures.get(path).map(|(status, body)| {
            let status = StatusCode::from_u16(*status).unwrap();
            (status, body.clone()).into_response()
        })
    }
}

/// Client tuned for tests: explicit base URL, short timeouts
pub fn client_for(base_url: &str) -> SessionClient {
    SessionClient::new(&test_server_config(base_url)).unwrap()
}

pub fn test_server_config(base_url: &str) -> ServerConfig {
    ServerConfig {
        request_timeout_secs: 2,
        connect_timeout_secs: 1,
        ..ServerConfig::with_base_url(base_url)
    }
}

/// Base URL on which nothing is listening
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Frame whose decoded text forces the mock's frame number (and reply delay)
pub fn scripted_frame(frame_number: u64, delay_ms: u64) -> sign_session::EncodedFrame {
    let text = format!("{frame_number}@{delay_ms}");
    sign_session::EncodedFrame::from_bytes(text.as_bytes(), "image/jpeg")
}

fn parse_script(frame: &str) -> Option<(u64, u64)> {
    let encoded = frame.rsplit(',').next()?;
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let (number, delay) = text.split_once('@').unwrap_or((text.as_str(), "0"));
    Some((number.parse().ok()?, delay.parse().ok()?))
}

async fn list_recordings(State(server): State<MockServer>) -> Response {
    if let Some(failure) = server.record_hit(RECORDINGS) {
        return failure;
    }

    let inner = server.inner.lock().unwrap();
    Json(json!({ "recordings": inner.finished })).into_response()
}

async fn start_recording(State(server): State<MockServer>, Json(body): Json<Value>) -> Response {
    if let Some(failure) = server.record_hit(START) {
        return failure;
    }

    let mut inner = server.inner.lock().unwrap();
    let session_id = inner
        .fixed_session_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    inner.sessions.insert(session_id.clone(), 0);
    inner.start_bodies.push(body);

    Json(json!({ "session_id": session_id, "status": "recording" })).into_response()
}

async fn process_frame(State(server): State<MockServer>, Json(body): Json<Value>) -> Response {
    if let Some(failure) = server.record_hit(PROCESS_FRAME) {
        return failure;
    }

    let Some(frame) = body.get("frame").and_then(Value::as_str).map(str::to_string) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No frame data provided" })),
        )
            .into_response();
    };

    let script = parse_script(&frame);
    let session_id = body.get("session_id").and_then(Value::as_str).map(str::to_string);

    let (frame_number, delay) = {
        let mut inner = server.inner.lock().unwrap();
        inner.frames.push(body.clone());

        let frame_number = session_id.as_ref().and_then(|id| {
            let next = inner.sessions.get_mut(id)?;
            let issued = script.map_or(*next, |(n, _)| n);
            *next = (*next).max(issued + 1);
            Some(issued)
        });
        let delay = script
            .map(|(_, ms)| Duration::from_millis(ms))
            .unwrap_or(inner.frame_delay);
        (frame_number, delay)
    };

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let landmarks = json!([[
        { "x": 0.5, "y": 0.25, "z": -0.01 },
        { "x": 0.52, "y": 0.3, "z": -0.02 }
    ]]);

    match (session_id, frame_number) {
        (Some(session_id), Some(frame_number)) => Json(json!({
            "session_id": session_id,
            "frame_number": frame_number,
            "detected": true,
            "landmarks": landmarks,
            "gesture": "hello",
        }))
        .into_response(),
        _ => Json(json!({ "detected": false, "landmarks": [] })).into_response(),
    }
}

async fn stop_recording(State(server): State<MockServer>, Json(body): Json<Value>) -> Response {
    if let Some(failure) = server.record_hit(STOP) {
        return failure;
    }

    let delay = {
        let mut inner = server.inner.lock().unwrap();
        if inner.slow_stops > 0 {
            inner.slow_stops -= 1;
            inner.slow_stop_delay
        } else {
            Duration::ZERO
        }
    };
    if !delay.is_zero() {
        // Reply arrives after the client gave up; nothing is changed server-side
        tokio::time::sleep(delay).await;
        return (StatusCode::SERVICE_UNAVAILABLE, "too slow").into_response();
    }

    let session_id = body
        .get("session_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut inner = server.inner.lock().unwrap();
    match inner.sessions.remove(&session_id) {
        Some(frame_count) => {
            inner.finished.push(json!({ "session_id": session_id, "frame_count": frame_count }));
            Json(json!({
                "session_id": session_id,
                "frame_count": frame_count,
                "status": "stopped",
            }))
            .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Session {} not found", session_id) })),
        )
            .into_response(),
    }
}
