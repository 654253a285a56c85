//! REST endpoints predating the JSON-RPC interface: `GET /mcp/{operation}[/{id}]`.
//!
//! The camelCase operation names a tool (`getFieldsByDealId` is `get_fields_by_deal_id`). The
//! trailing id binds to the tool's first path parameter, or to its first required argument for
//! hand-written tools. Results are the tool's raw JSON; failures are `{"detail": message}`.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, Request, State},
    response::{IntoResponse, Response},
};
use convert_case::{Case, Casing};
use serde_json::{Value, json};

use crate::{
    context::AppContext,
    dispatcher::{Caller, RequestMeta, call_tool},
    error::McpError,
    handler,
    registry::ResolvedTool,
    tool::JsonObject,
};

pub(crate) async fn operation(
    State(context): State<Arc<AppContext>>,
    Path(operation): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
    request: Request,
) -> Response {
    let meta = handler::request_meta(&context, &request);
    respond(&context, &operation, None, query, meta).await
}

pub(crate) async fn operation_with_id(
    State(context): State<Arc<AppContext>>,
    Path((operation, id)): Path<(String, String)>,
    Query(query): Query<Vec<(String, String)>>,
    request: Request,
) -> Response {
    let meta = handler::request_meta(&context, &request);
    respond(&context, &operation, Some(id), query, meta).await
}

async fn respond(
    context: &AppContext,
    operation: &str,
    id: Option<String>,
    query: Vec<(String, String)>,
    meta: RequestMeta,
) -> Response {
    match execute(context, operation, id, query, &meta).await {
        Ok(body) => Json(body).into_response(),
        Err(error) => {
            if let McpError::Internal(ref inner) = error {
                log::error!("Unhandled error in GET {operation}: {inner:?}");
            }

            (error.http_status(), Json(json!({ "detail": error.to_string() }))).into_response()
        }
    }
}

async fn execute(
    context: &AppContext,
    operation: &str,
    id: Option<String>,
    query: Vec<(String, String)>,
    meta: &RequestMeta,
) -> Result<Value, McpError> {
    let name = operation.to_case(Case::Snake);
    let mut arguments = query_arguments(query);

    if let Some(id) = id {
        let tool = context
            .registry()
            .resolve(&name)
            .ok_or_else(|| McpError::UnknownTool(name.clone()))?;

        if let Some(key) = id_argument(&tool) {
            arguments.insert(key, Value::String(id));
        }
    }

    // No sessions here: the header credential, else the configured default.
    let caller = Caller {
        session_id: None,
        client_ip: meta.client_ip,
        credential: meta.credential.as_ref(),
        base_url: &meta.base_url,
    };

    let output = call_tool(context, &caller, &name, arguments).await?;

    Ok(output.into_json())
}

fn id_argument(tool: &ResolvedTool<'_>) -> Option<String> {
    match tool {
        ResolvedTool::Proxy(tool) => tool.path_parameters().first().cloned(),
        ResolvedTool::Static(_) => tool
            .to_tool()
            .input_schema
            .get("required")
            .and_then(|required| required.get(0))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

/// Query pairs as tool arguments. A repeated key collects its values into an array.
fn query_arguments(query: Vec<(String, String)>) -> JsonObject {
    let mut arguments = JsonObject::new();

    for (key, value) in query {
        match arguments.get_mut(&key) {
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                arguments.insert(key, Value::String(value));
            }
        }
    }

    arguments
}
