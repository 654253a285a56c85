use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Contents of every file the mock serves.
pub const FILE_CONTENTS: &str = "%PDF-1.4 quarterly report";

/// File ids with this prefix have no signed URL, so they are fetched from the file host.
pub const UNSIGNED_FILE_PREFIX: &str = "unsigned-";

/// File id whose signed URL answers with a server error.
pub const BROKEN_SIGNED_FILE: &str = "broken";

#[derive(Default)]
struct Recorded {
    authorizations: Vec<String>,
    requests: Vec<String>,
}

struct Shared {
    address: SocketAddr,
    recorded: Mutex<Recorded>,
}

type MockState = State<Arc<Shared>>;

/// A stand-in for the Dealpath REST API, its signed file URLs and the file host.
///
/// Deal `404` does not exist. Signed URLs point back at the mock under `/signed/{file_id}`.
#[derive(Clone)]
pub struct MockDealpath {
    shared: Arc<Shared>,
}

impl MockDealpath {
    /// Binds the mock to an ephemeral port and serves it in the background.
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let shared = Arc::new(Shared {
            address: listener.local_addr().unwrap(),
            recorded: Mutex::new(Recorded::default()),
        });

        let router = Router::new()
            .route("/deals", get(deals))
            .route("/deal/{deal_id}", get(deal))
            .route("/files/deal/{deal_id}", get(deal_files))
            .route("/file/{file_id}/download_url", get(download_url))
            .route("/signed/{file_id}", get(signed_file))
            .route("/files/file/{file_id}", get(file))
            .with_state(shared.clone());

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { shared }
    }

    /// The `[dealpath]` section pointing the gateway at this mock.
    pub fn config_section(&self) -> String {
        format!(
            "[dealpath]\nbase_url = \"http://{0}\"\nfiles_base_url = \"http://{0}/files\"\nmax_retries = 0\n",
            self.shared.address
        )
    }

    /// Address the mock listens on.
    pub fn address(&self) -> SocketAddr {
        self.shared.address
    }

    /// `Authorization` headers received so far, in order.
    pub fn authorizations(&self) -> Vec<String> {
        self.shared.recorded.lock().unwrap().authorizations.clone()
    }

    /// Request paths and queries received so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.shared.recorded.lock().unwrap().requests.clone()
    }
}

fn record(shared: &Shared, headers: &HeaderMap, request: String) {
    let mut recorded = shared.recorded.lock().unwrap();

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    recorded.authorizations.push(authorization);
    recorded.requests.push(request);
}

fn deal_data(deal_id: &str) -> Value {
    json!({
        "id": deal_id,
        "name": format!("Deal {deal_id} Tower"),
        "status": "Active",
        "address": { "city": "Chicago", "state": "IL" },
    })
}

async fn deals(
    State(shared): MockState,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Json<Value> {
    let query = query
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    record(&shared, &headers, format!("/deals?{query}"));

    Json(json!({
        "deals": {
            "data": [deal_data("1"), deal_data("2")],
            "next_token": null,
        }
    }))
}

async fn deal(
    State(shared): MockState,
    headers: HeaderMap,
    Path(deal_id): Path<String>,
) -> Response {
    record(&shared, &headers, format!("/deal/{deal_id}"));

    if deal_id == "404" {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Deal not found" }))).into_response();
    }

    Json(json!({ "deal": { "data": deal_data(&deal_id) } })).into_response()
}

async fn deal_files(
    State(shared): MockState,
    headers: HeaderMap,
    Path(deal_id): Path<String>,
) -> Json<Value> {
    record(&shared, &headers, format!("/files/deal/{deal_id}"));

    Json(json!({
        "files": {
            "data": [{ "id": "f-1", "name": "report.pdf", "deal_id": deal_id }],
            "next_token": null,
        }
    }))
}

async fn download_url(State(shared): MockState, headers: HeaderMap, Path(file_id): Path<String>) -> Json<Value> {
    record(&shared, &headers, format!("/file/{file_id}/download_url"));

    if file_id.starts_with(UNSIGNED_FILE_PREFIX) {
        return Json(json!({ "url": null, "name": "report.pdf" }));
    }

    let url = format!("http://{}/signed/{file_id}?expires=3600", shared.address);

    Json(json!({ "url": url, "name": "report.pdf" }))
}

async fn signed_file(State(shared): MockState, headers: HeaderMap, Path(file_id): Path<String>) -> Response {
    record(&shared, &headers, format!("/signed/{file_id}"));

    if file_id == BROKEN_SIGNED_FILE {
        return (StatusCode::INTERNAL_SERVER_ERROR, "storage unavailable").into_response();
    }

    ([(header::CONTENT_TYPE, "application/pdf")], FILE_CONTENTS).into_response()
}

async fn file(State(shared): MockState, headers: HeaderMap, Path(file_id): Path<String>) -> Response {
    record(&shared, &headers, format!("/files/file/{file_id}"));

    (
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"Q3 report.pdf\""),
        ],
        FILE_CONTENTS,
    )
        .into_response()
}
