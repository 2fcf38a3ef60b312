use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::core::constants::SESSION_HEADER;

/// One request as seen by [`FakeBackend`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub session: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct FakeInner {
    requests: Mutex<Vec<RecordedRequest>>,
    failure: Option<(u16, String)>,
}

/// In-process stand-in for the astrology backend: `/kundli` answers with a
/// JSON array, `/chat` echoes the query, `/ping` reports ok.
#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<FakeInner>,
}

impl FakeBackend {
    /// Every endpoint answers `status` with `body` as plain text.
    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            inner: Arc::new(FakeInner {
                requests: Mutex::new(Vec::new()),
                failure: Some((status, body.to_string())),
            }),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.requests.lock().unwrap().clone()
    }

    fn record(&self, uri: &Uri, headers: &HeaderMap, body: &str) -> Option<Response> {
        let session = headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = serde_json::from_str(body).unwrap_or(Value::Null);
        self.inner.requests.lock().unwrap().push(RecordedRequest {
            path: uri.path().to_string(),
            session,
            body,
        });

        self.inner.failure.as_ref().map(|(status, text)| {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, text.clone()).into_response()
        })
    }
}

async fn kundli(
    State(fake): State<FakeBackend>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Some(failure) = fake.record(&uri, &headers, &body) {
        return failure;
    }
    let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let summary = format!(
        "Kundli for {}-{}-{}",
        payload["year"], payload["month"], payload["date"]
    );
    Json(json!([summary])).into_response()
}

async fn chat(
    State(fake): State<FakeBackend>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Some(failure) = fake.record(&uri, &headers, &body) {
        return failure;
    }
    let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let query = payload["query"].as_str().unwrap_or_default();
    Json(json!({ "response": format!("echo: {query}") })).into_response()
}

async fn ping(State(fake): State<FakeBackend>, uri: Uri, headers: HeaderMap) -> Response {
    if let Some(failure) = fake.record(&uri, &headers, "") {
        return failure;
    }
    Json(json!({ "status": "ok" })).into_response()
}

/// Serve `fake` on an ephemeral local port and return its base URL.
pub async fn spawn_fake_backend(fake: FakeBackend) -> String {
    let app = Router::new()
        .route("/kundli", post(kundli))
        .route("/chat", post(chat))
        .route("/ping", get(ping))
        .with_state(fake);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake backend");
    let addr = listener.local_addr().expect("fake backend address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

/// A base URL nothing listens on.
pub async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{addr}")
}

pub const SAMPLE_KUNDLI_MARKDOWN: &str = "## Your Kundli at a glance\n\n- **Ascendant**: Libra\n- **Moon**: Rohini nakshatra, Taurus\n\n| Planet | Sign | House |\n|---|---|---|\n| Sun | Gemini | 9 |\n| Saturn | Capricorn | 4 |\n\n> Current Mahadasha: *Venus* until 2031.\n\n```text\nVimshottari: Ve-Su-Mo\n```";
