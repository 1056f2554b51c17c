//! In-process fake of the ERP bulk-data API, served by axum on an
//! ephemeral port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

/// How the fake answers the income endpoint.
#[derive(Clone, Copy, Debug)]
pub enum IncomeMode {
    /// Two full pages of two rows, then a short page of one.
    Paginated,
    /// Always answers 500 with a long body.
    ServerError,
    /// Answers 200 with an HTML maintenance page.
    NotJson,
    /// Holds every request for five seconds before answering.
    Slow,
}

#[derive(Default)]
pub struct Recorded {
    pub authorization: Vec<String>,
    pub requests: Vec<(String, HashMap<String, String>)>,
}

#[derive(Clone)]
struct FakeState {
    mode: IncomeMode,
    recorded: Arc<Mutex<Recorded>>,
}

pub struct FakeRemote {
    pub addr: SocketAddr,
    pub recorded: Arc<Mutex<Recorded>>,
    server: tokio::task::JoinHandle<()>,
}

impl FakeRemote {
    pub async fn start(mode: IncomeMode) -> Self {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let state = FakeState {
            mode,
            recorded: Arc::clone(&recorded),
        };

        let app = Router::new()
            .route("/customer-extract-history", get(customer_extract))
            .route("/income", get(income))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake remote");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake remote crashed");
        });

        Self {
            addr,
            recorded,
            server,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn authorization_headers(&self) -> Vec<String> {
        self.recorded.lock().unwrap().authorization.clone()
    }

    pub fn requests_to(&self, endpoint: &str) -> Vec<HashMap<String, String>> {
        self.recorded
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|(path, _)| path == endpoint)
            .map(|(_, query)| query.clone())
            .collect()
    }
}

impl Drop for FakeRemote {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn record(state: &FakeState, path: &str, headers: &HeaderMap, query: HashMap<String, String>) {
    let mut recorded = state.recorded.lock().unwrap();
    if let Some(value) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        recorded.authorization.push(value.to_string());
    }
    recorded.requests.push((path.to_string(), query));
}

/// Ignores pagination and echoes the same full page forever.
async fn customer_extract(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&state, "/customer-extract-history", &headers, query);
    Json(json!({
        "resultSetMetadata": { "count": 2 },
        "data": [{ "id": 1 }, { "id": 2 }],
    }))
}

async fn income(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let selection = query.get("selectionType").cloned().unwrap_or_default();
    record(&state, "/income", &headers, query);

    match state.mode {
        IncomeMode::ServerError => {
            (StatusCode::INTERNAL_SERVER_ERROR, "x".repeat(2000)).into_response()
        }
        IncomeMode::NotJson => (
            [(axum::http::header::CONTENT_TYPE, "text/html")],
            "<html><body>Under maintenance</body></html>",
        )
            .into_response(),
        IncomeMode::Slow => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(Value::Array(Vec::new())).into_response()
        }
        IncomeMode::Paginated => {
            let rows: Vec<Value> = match page {
                1 | 2 => (0..2)
                    .map(|i| json!({ "selection": selection, "page": page, "row": i }))
                    .collect(),
                3 => vec![json!({ "selection": selection, "page": 3, "row": 0 })],
                _ => Vec::new(),
            };
            Json(Value::Array(rows)).into_response()
        }
    }
}
