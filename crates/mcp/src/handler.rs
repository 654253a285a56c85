use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json,
    body::to_bytes,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use secrecy::SecretString;
use serde_json::{Value, json};

use crate::{
    context::AppContext,
    dispatcher::{self, RequestMeta},
    error::McpError,
    jsonrpc::JsonRpcResponse,
};

/// Header carrying the MCP session id, on requests and on `initialize` responses.
pub const SESSION_HEADER: &str = "mcp-session-id";

const MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

pub(crate) async fn post(State(context): State<Arc<AppContext>>, request: Request) -> Response {
    let meta = request_meta(&context, &request);

    let body = match to_bytes(request.into_body(), MAX_BODY_SIZE).await {
        Ok(body) => body,
        Err(error) => return parse_error(error.to_string()),
    };

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(error) => return parse_error(error.to_string()),
    };

    let dispatched = dispatcher::dispatch(&context, &meta, payload).await;

    let mut response = if dispatched.responses.is_empty() {
        StatusCode::ACCEPTED.into_response()
    } else if dispatched.batch {
        Json(dispatched.responses).into_response()
    } else {
        let mut responses = dispatched.responses;
        Json(responses.swap_remove(0)).into_response()
    };

    if let Some(session_id) = dispatched.created_session
        && let Ok(value) = HeaderValue::from_str(&session_id)
    {
        response.headers_mut().insert(SESSION_HEADER, value);
    }

    response
}

pub(crate) async fn get(State(context): State<Arc<AppContext>>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "message": "Dealpath MCP HTTP endpoint",
        "protocolVersion": context.config().protocol_version,
    }))
}

fn parse_error(message: String) -> Response {
    log::debug!("Rejecting unparsable JSON-RPC body: {message}");

    let body = JsonRpcResponse::error(Value::Null, McpError::Parse(message));

    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

pub(crate) fn request_meta(context: &AppContext, request: &Request) -> RequestMeta {
    let headers = request.headers();

    RequestMeta {
        session_id: header_str(headers, SESSION_HEADER).map(str::to_string),
        credential: credential(context, headers),
        client_ip: request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(address)| address.ip()),
        base_url: base_url(context, headers),
    }
}

/// The credential header, when present and not blank.
fn credential(context: &AppContext, headers: &HeaderMap) -> Option<SecretString> {
    header_str(headers, &context.config().credential_header)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(SecretString::from)
}

/// The configured public URL, else `{x-forwarded-proto or http}://{host}`.
fn base_url(context: &AppContext, headers: &HeaderMap) -> String {
    if let Some(url) = context.public_url() {
        return url.as_str().trim_end_matches('/').to_string();
    }

    let scheme = header_str(headers, "x-forwarded-proto")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("http");

    let host = header_str(headers, header::HOST.as_str()).unwrap_or("localhost");

    format!("{scheme}://{host}")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
