use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use http::StatusCode;
use mcp::{AppContext, Readiness};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(crate) enum HealthState {
    /// The process is up and serving.
    Healthy,
    /// The process is alive, without looking at its dependencies.
    Alive,
    /// Requests can be served.
    Ready { checks: Readiness },
    /// A dependency is missing.
    NotReady { checks: Readiness },
}

/// Routes `{path}`, `{path}/live` and `{path}/ready`.
pub(crate) fn router(path: &str, context: Arc<AppContext>) -> Router {
    let path = path.trim_end_matches('/');

    Router::new()
        .route(path, get(health))
        .route(&format!("{path}/live"), get(live))
        .route(&format!("{path}/ready"), get(ready))
        .with_state(context)
}

async fn health() -> (StatusCode, Json<HealthState>) {
    (StatusCode::OK, Json(HealthState::Healthy))
}

async fn live() -> (StatusCode, Json<HealthState>) {
    (StatusCode::OK, Json(HealthState::Alive))
}

async fn ready(State(context): State<Arc<AppContext>>) -> (StatusCode, Json<HealthState>) {
    let checks = context.readiness().await;

    if checks.is_ready() {
        (StatusCode::OK, Json(HealthState::Ready { checks }))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(HealthState::NotReady { checks }))
    }
}
