//! In-process fake of the Google endpoints liftgrid talks to.
//!
//! Serves on an ephemeral loopback port:
//! - `POST /token`: OAuth2 code exchange and refresh
//! - `POST /revoke`: token revocation
//! - `PUT /v4/spreadsheets/{id}/values/{range}`: single-cell writes
//! - `GET /spreadsheets/d/{id}/gviz/tq`: CSV export
//!
//! Behavior is steered through setters and observed through counters.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// A cell write observed by the fake.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub document_id: String,
    pub range: String,
    pub value: String,
    pub bearer: Option<String>,
}

#[derive(Default)]
struct FakeState {
    code_exchanges: AtomicUsize,
    refreshes: AtomicUsize,
    revocations: AtomicUsize,
    issued: AtomicUsize,
    csv_requests: AtomicUsize,
    token_error: Mutex<Option<(u16, String)>>,
    rotate_refresh_token: Mutex<Option<String>>,
    expires_in: Mutex<Option<i64>>,
    failing_ranges: Mutex<HashSet<String>>,
    writes: Mutex<Vec<RecordedWrite>>,
    documents: Mutex<HashMap<String, String>>,
}

/// Handle to a running fake server. The server stops when this is dropped.
pub struct FakeGoogle {
    addr: SocketAddr,
    state: Arc<FakeState>,
    shutdown: CancellationToken,
}

impl FakeGoogle {
    /// Start the fake on `127.0.0.1:0`.
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let app = router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind fake server");
        let addr = listener.local_addr().expect("listener has an address");

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone().cancelled_owned();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(signal)
                .await;
        });

        Self {
            addr,
            state,
            shutdown,
        }
    }

    /// Base URL without trailing slash, e.g. `http://127.0.0.1:41234`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Full token endpoint URL.
    pub fn token_url(&self) -> String {
        format!("{}/token", self.base_url())
    }

    /// Full revocation endpoint URL.
    pub fn revoke_url(&self) -> String {
        format!("{}/revoke", self.base_url())
    }

    // -- steering ----------------------------------------------------------

    /// Make every token request fail with the given status and body.
    pub fn reject_tokens(&self, status: u16, body: &str) {
        *self.state.token_error.lock().unwrap() = Some((status, body.to_string()));
    }

    /// Return a new refresh token from refresh grants.
    pub fn rotate_refresh_token(&self, token: &str) {
        *self.state.rotate_refresh_token.lock().unwrap() = Some(token.to_string());
    }

    /// Override `expires_in` (seconds) of issued tokens. Default 3600.
    pub fn set_expires_in(&self, seconds: i64) {
        *self.state.expires_in.lock().unwrap() = Some(seconds);
    }

    /// Make writes to `range` (as sent, e.g. `Sheet1!B3` or `C3`) fail with 500.
    pub fn fail_range(&self, range: &str) {
        self.state
            .failing_ranges
            .lock()
            .unwrap()
            .insert(range.to_string());
    }

    /// Serve `csv` as the export of `document_id`.
    pub fn publish_csv(&self, document_id: &str, csv: &str) {
        self.state
            .documents
            .lock()
            .unwrap()
            .insert(document_id.to_string(), csv.to_string());
    }

    // -- observation -------------------------------------------------------

    pub fn code_exchanges(&self) -> usize {
        self.state.code_exchanges.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.state.refreshes.load(Ordering::SeqCst)
    }

    pub fn revocations(&self) -> usize {
        self.state.revocations.load(Ordering::SeqCst)
    }

    pub fn csv_requests(&self) -> usize {
        self.state.csv_requests.load(Ordering::SeqCst)
    }

    /// Writes that were accepted, in arrival order.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state.writes.lock().unwrap().clone()
    }
}

impl Drop for FakeGoogle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn router(state: Arc<FakeState>) -> Router {
    Router::new()
        .route("/token", post(token))
        .route("/revoke", post(revoke))
        .route("/v4/spreadsheets/{id}/values/{range}", put(update_value))
        .route("/spreadsheets/d/{id}/gviz/tq", get(export_csv))
        .with_state(state)
}

async fn token(
    State(state): State<Arc<FakeState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let grant = form.get("grant_type").map(String::as_str).unwrap_or("");
    match grant {
        "authorization_code" => state.code_exchanges.fetch_add(1, Ordering::SeqCst),
        "refresh_token" => state.refreshes.fetch_add(1, Ordering::SeqCst),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "unsupported_grant_type" })),
            )
                .into_response();
        }
    };

    if let Some((status, body)) = state.token_error.lock().unwrap().clone() {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST);
        return (status, body).into_response();
    }

    if grant == "authorization_code" && form.get("code").is_none_or(|c| c.is_empty()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response();
    }

    let n = state.issued.fetch_add(1, Ordering::SeqCst) + 1;
    let expires_in = state.expires_in.lock().unwrap().unwrap_or(3600);
    let refresh_token = match grant {
        "authorization_code" => Some("fake-refresh-token".to_string()),
        _ => state.rotate_refresh_token.lock().unwrap().clone(),
    };

    let mut body = json!({
        "access_token": format!("fake-access-{n}"),
        "expires_in": expires_in,
        "token_type": "Bearer",
    });
    if let Some(rt) = refresh_token {
        body["refresh_token"] = json!(rt);
    }
    Json(body).into_response()
}

async fn revoke(
    State(state): State<Arc<FakeState>>,
    Form(form): Form<HashMap<String, String>>,
) -> StatusCode {
    if form.get("token").is_none_or(|t| t.is_empty()) {
        return StatusCode::BAD_REQUEST;
    }
    state.revocations.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

#[derive(Deserialize)]
struct ValueRange {
    values: Vec<Vec<serde_json::Value>>,
}

async fn update_value(
    State(state): State<Arc<FakeState>>,
    Path((id, range)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<ValueRange>,
) -> Response {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    if bearer.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    if state.failing_ranges.lock().unwrap().contains(&range) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "message": "backend error" } })),
        )
            .into_response();
    }

    let value = match body.values.first().and_then(|row| row.first()) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    state.writes.lock().unwrap().push(RecordedWrite {
        document_id: id.clone(),
        range: range.clone(),
        value,
        bearer,
    });

    Json(json!({
        "spreadsheetId": id,
        "updatedRange": range,
        "updatedCells": 1,
    }))
    .into_response()
}

async fn export_csv(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
    Query(_params): Query<HashMap<String, String>>,
) -> Response {
    state.csv_requests.fetch_add(1, Ordering::SeqCst);
    match state.documents.lock().unwrap().get(&id) {
        Some(csv) => ([("content-type", "text/csv")], csv.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
