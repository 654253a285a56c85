//! JSON-RPC 2.0 envelopes.

use rmcp::model::ErrorData;
use serde::Serialize;
use serde_json::Value;

use crate::{error::McpError, tool::JsonObject};

/// One parsed entry of a request body.
#[derive(Debug)]
pub(crate) struct JsonRpcRequest {
    /// Absent for notifications.
    pub id: Option<Value>,
    pub method: String,
    pub params: JsonObject,
}

impl JsonRpcRequest {
    /// Reads a request object. `type` is accepted in place of `method`.
    ///
    /// On failure the id, when one could be read, is returned alongside the error so the
    /// error response can still be correlated.
    pub fn parse(entry: Value) -> Result<Self, (Value, McpError)> {
        let Value::Object(mut object) = entry else {
            return Err((Value::Null, McpError::InvalidRequest));
        };

        let id = object.remove("id");

        let method = ["method", "type"]
            .into_iter()
            .find_map(|key| match object.remove(key) {
                Some(Value::String(method)) if !method.is_empty() => Some(method),
                _ => None,
            });

        let Some(method) = method else {
            return Err((id.unwrap_or(Value::Null), McpError::MissingMethod));
        };

        let params = match object.remove("params") {
            Some(Value::Object(params)) => params,
            _ => JsonObject::new(),
        };

        Ok(Self { id, method, params })
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Outcome {
    Result(Value),
    Error(ErrorData),
}

/// A response entry: `{"jsonrpc": "2.0", "id": ..., "result" | "error": ...}`.
#[derive(Debug, Serialize)]
pub(crate) struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(flatten)]
    outcome: Outcome,
}

impl JsonRpcResponse {
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: Outcome::Result(result),
        }
    }

    pub fn error(id: Value, error: McpError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: Outcome::Error(error.into()),
        }
    }
}
