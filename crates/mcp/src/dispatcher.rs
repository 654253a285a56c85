//! Routes JSON-RPC requests to their handlers.
//!
//! Entries of a batch are handled one after another. An `initialize` inside a batch makes its
//! new session the current one for the entries that follow it.

use std::net::IpAddr;

use rate_limit::RateLimitRequest;
use rmcp::model::ListResourcesResult;
use secrecy::SecretString;
use serde::Serialize;
use serde_json::{Value, json};
use telemetry::metrics::{MCP_TOOL_CALL_DURATION, Recorder};

use crate::{
    content::ToolOutput,
    context::AppContext,
    error::McpError,
    jsonrpc::{JsonRpcRequest, JsonRpcResponse},
    prompts,
    registry::ResolvedTool,
    resources,
    session::SessionInfo,
    tool::{JsonObject, ToolContext},
};

const INSTRUCTIONS: &str = "Tools query the Dealpath API: list and search deals, fetch a deal, its fields, \
     files and folders. get_file_by_id stores the file on this server and links to it. \
     Deals are also readable as resources under dealpath://deal/{id}.json and dealpath://deal/{id}.md.";

/// What the transport knows about the caller.
#[derive(Debug, Default)]
pub(crate) struct RequestMeta {
    /// Value of the `Mcp-Session-Id` header.
    pub session_id: Option<String>,
    /// Credential sent in the credential header.
    pub credential: Option<SecretString>,
    pub client_ip: Option<IpAddr>,
    /// Base URL under which `/local-files` links are built.
    pub base_url: String,
}

/// Identity of a tool call, for rate limiting and credential selection.
pub(crate) struct Caller<'a> {
    pub session_id: Option<&'a str>,
    pub client_ip: Option<IpAddr>,
    /// The session or header credential. The configured default applies when absent.
    pub credential: Option<&'a SecretString>,
    pub base_url: &'a str,
}

/// Responses of one POST body.
#[derive(Debug)]
pub(crate) struct Dispatched {
    pub responses: Vec<JsonRpcResponse>,
    pub batch: bool,
    /// The first session created by an `initialize` in the body.
    pub created_session: Option<String>,
}

struct BatchState {
    session_id: Option<String>,
    created_session: Option<String>,
}

pub(crate) async fn dispatch(context: &AppContext, meta: &RequestMeta, payload: Value) -> Dispatched {
    let (entries, batch) = match payload {
        Value::Array(entries) => (entries, true),
        entry => (vec![entry], false),
    };

    if batch && entries.is_empty() {
        return Dispatched {
            responses: vec![JsonRpcResponse::error(Value::Null, McpError::InvalidRequest)],
            batch: false,
            created_session: None,
        };
    }

    let mut state = BatchState {
        session_id: meta.session_id.clone(),
        created_session: None,
    };

    let mut responses = Vec::with_capacity(entries.len());

    for entry in entries {
        let request = match JsonRpcRequest::parse(entry) {
            Ok(request) => request,
            Err((id, error)) => {
                responses.push(JsonRpcResponse::error(id, error));
                continue;
            }
        };

        let notification = request.is_notification();
        let method = request.method.clone();
        let id = request.id.clone().unwrap_or(Value::Null);

        let outcome = handle(context, meta, &mut state, request).await;

        if notification {
            if let Err(error) = outcome {
                log::debug!("Notification {method} failed: {error}");
            }

            continue;
        }

        match outcome {
            Ok(result) => responses.push(JsonRpcResponse::result(id, result)),
            Err(error) => {
                log::debug!("Request {method} failed: {error}");
                responses.push(JsonRpcResponse::error(id, error));
            }
        }
    }

    Dispatched {
        responses,
        batch,
        created_session: state.created_session,
    }
}

async fn handle(
    context: &AppContext,
    meta: &RequestMeta,
    state: &mut BatchState,
    request: JsonRpcRequest,
) -> Result<Value, McpError> {
    let JsonRpcRequest { method, params, .. } = request;

    if method == "initialize" {
        return Ok(initialize(context, meta, state, &params));
    }

    let session = state
        .session_id
        .as_deref()
        .and_then(|id| Some((id, context.sessions().get(id)?)));

    let session_exempt = method == "ping" || method.starts_with("notifications/");

    if context.config().session.required && session.is_none() && !session_exempt {
        return Err(McpError::SessionNotFound);
    }

    match method.as_str() {
        "ping" => Ok(json!({ "ok": true })),
        "notifications/initialized" => {
            if let Some((id, _)) = session {
                context.sessions().mark_initialized(id);
            }

            Ok(Value::Null)
        }
        _ if method.starts_with("notifications/") => Ok(Value::Null),
        "tools/list" | "tools.list" => to_result(context.registry().list()),
        "tools/call" | "tools.call" => {
            let name = params
                .get("name")
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .ok_or(McpError::MissingToolName)?;

            let arguments = match params.get("arguments") {
                Some(Value::Object(arguments)) => arguments.clone(),
                _ => JsonObject::new(),
            };

            let caller = caller(meta, session.as_ref());
            let output = call_tool(context, &caller, name, arguments).await?;

            to_result(output.into_call_result())
        }
        "resources/list" => to_result(ListResourcesResult::with_all_items(Vec::new())),
        "resources/templates/list" => to_result(resources::templates()),
        "resources/read" => {
            let uri = params
                .get("uri")
                .and_then(Value::as_str)
                .ok_or_else(|| McpError::MissingArgument("uri".to_string()))?;

            let caller = caller(meta, session.as_ref());
            let api = context.api(caller.credential)?;
            to_result(resources::read(api.as_ref(), context.cache(), uri).await?)
        }
        "prompts/list" => to_result(prompts::list()),
        "prompts/get" => {
            let name = params
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| McpError::MissingArgument("name".to_string()))?;

            let arguments = match params.get("arguments") {
                Some(Value::Object(arguments)) => arguments.clone(),
                _ => JsonObject::new(),
            };

            to_result(prompts::get(name, &arguments)?)
        }
        _ => Err(McpError::MethodNotFound(method)),
    }
}

fn to_result(result: impl Serialize) -> Result<Value, McpError> {
    serde_json::to_value(result).map_err(|error| McpError::Internal(error.into()))
}

fn initialize(context: &AppContext, meta: &RequestMeta, state: &mut BatchState, params: &JsonObject) -> Value {
    let credential = meta.credential.clone().or_else(|| {
        params
            .get("dealpathApiKey")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(SecretString::from)
    });

    let bound = credential.is_some();
    let session_id = context.sessions().create(credential);

    log::debug!("Session {session_id} created (credential bound: {bound})");

    state.session_id = Some(session_id.clone());
    state.created_session.get_or_insert(session_id);

    json!({
        "protocolVersion": context.config().protocol_version,
        "capabilities": {
            "tools": { "listChanged": false },
            "resources": { "listChanged": false },
            "prompts": { "listChanged": false },
        },
        "serverInfo": {
            "name": "dealpath-mcp",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "instructions": INSTRUCTIONS,
    })
}

fn caller<'a>(meta: &'a RequestMeta, session: Option<&'a (&'a str, SessionInfo)>) -> Caller<'a> {
    Caller {
        session_id: session.map(|(id, _)| *id),
        client_ip: meta.client_ip,
        credential: session
            .and_then(|(_, info)| info.credential.as_ref())
            .or(meta.credential.as_ref()),
        base_url: &meta.base_url,
    }
}

/// Runs a tool on behalf of a caller: resolution, rate limit, upstream call, metrics.
///
/// Every outcome is counted in the per-tool statistics, rejected calls included.
pub(crate) async fn call_tool(
    context: &AppContext,
    caller: &Caller<'_>,
    name: &str,
    arguments: JsonObject,
) -> Result<ToolOutput, McpError> {
    let mut recorder = Recorder::new(MCP_TOOL_CALL_DURATION);
    recorder.push_attribute("tool.name", name.to_string());

    let result = limit_and_run(context, caller, name, arguments).await;

    recorder.push_attribute("status", if result.is_ok() { "success" } else { "error" });
    let elapsed = recorder.record();

    context.stats().record(name, elapsed, result.is_ok());

    result
}

async fn limit_and_run(
    context: &AppContext,
    caller: &Caller<'_>,
    name: &str,
    arguments: JsonObject,
) -> Result<ToolOutput, McpError> {
    // Unknown names fail before they can spend a rate limit token.
    let tool = context
        .registry()
        .resolve(name)
        .ok_or_else(|| McpError::UnknownTool(name.to_string()))?;

    let request = RateLimitRequest::builder()
        .maybe_session(caller.session_id)
        .maybe_ip(caller.client_ip)
        .build();

    context.rate_limit().check_request(&request).await?;

    run(context, caller, tool, arguments).await
}

async fn run(
    context: &AppContext,
    caller: &Caller<'_>,
    tool: ResolvedTool<'_>,
    arguments: JsonObject,
) -> Result<ToolOutput, McpError> {
    let api = context.api(caller.credential)?;

    match tool {
        ResolvedTool::Static(tool) => {
            let tool_context = ToolContext {
                api,
                cache: context.cache(),
                files: context.files(),
                base_url: caller.base_url,
            };

            tool.call(tool_context, arguments).await
        }
        ResolvedTool::Proxy(tool) => tool.call(api.as_ref(), arguments).await,
    }
}
