use dealpath::UpstreamError;
use http::StatusCode;
use rmcp::model::{ErrorCode, ErrorData};
use serde_json::{Value, json};

use crate::files::LocalFileError;

/// Session ids that do not resolve, when sessions are mandatory.
const SESSION_NOT_FOUND: ErrorCode = ErrorCode(-32001);

/// Everything that can go wrong while handling a JSON-RPC request.
///
/// Protocol errors use JSON-RPC codes; domain errors use the HTTP status that describes them.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// The request body is not JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A batch entry is not a JSON-RPC request object.
    #[error("Invalid request")]
    InvalidRequest,

    /// The request has neither `method` nor `type`.
    #[error("Missing method")]
    MissingMethod,

    /// The method is not served.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// `tools/call` without a tool name.
    #[error("Missing tool name")]
    MissingToolName,

    /// Sessions are mandatory and the request does not reference a live one.
    #[error("Session not found")]
    SessionNotFound,

    /// A required argument is absent or empty.
    #[error("{0} is required")]
    MissingArgument(String),

    /// Arguments do not match the tool's input schema.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// No tool with this name.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// No prompt with this name.
    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),

    /// A resource URI outside the `dealpath://` scheme.
    #[error("Invalid resource URI: {0}")]
    InvalidUri(String),

    /// No credential could be resolved for the upstream call.
    #[error("Missing Dealpath API key. Initialize the session with one, send it in a header, or configure a default.")]
    MissingCredential,

    /// The caller's bucket is empty.
    #[error("Rate limit exceeded. Retry after {retry_after_seconds} seconds.")]
    RateLimited {
        /// Seconds until a token is available again.
        retry_after_seconds: u64,
    },

    /// The upstream API failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// A file could not be fetched or stored.
    #[error("Failed to fetch file: {0}")]
    FileFetch(String),

    /// Anything unexpected.
    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl McpError {
    /// The numeric code placed in the JSON-RPC error object.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Parse(_) => ErrorCode::PARSE_ERROR,
            Self::InvalidRequest | Self::MissingMethod => ErrorCode::INVALID_REQUEST,
            Self::MethodNotFound(_) => ErrorCode::METHOD_NOT_FOUND,
            Self::MissingToolName => ErrorCode::INVALID_PARAMS,
            Self::SessionNotFound => SESSION_NOT_FOUND,
            _ => ErrorCode(i32::from(self.http_status().as_u16())),
        }
    }

    /// The HTTP status describing the error, used directly by the REST endpoints.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Parse(_)
            | Self::InvalidRequest
            | Self::MissingMethod
            | Self::MissingToolName
            | Self::MissingArgument(_)
            | Self::InvalidArguments(_)
            | Self::InvalidUri(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotFound(_) | Self::UnknownTool(_) | Self::UnknownPrompt(_) | Self::SessionNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::MissingCredential => StatusCode::UNAUTHORIZED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(UpstreamError::InvalidCredential) => StatusCode::UNAUTHORIZED,
            Self::Upstream(error) => error.upstream_status().unwrap_or(StatusCode::BAD_GATEWAY),
            Self::FileFetch(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn data(&self) -> Option<Value> {
        match self {
            Self::RateLimited { retry_after_seconds } => Some(json!({ "retry_after_seconds": retry_after_seconds })),
            Self::Internal(error) => Some(json!({ "message": error.to_string() })),
            _ => None,
        }
    }
}

impl From<LocalFileError> for McpError {
    fn from(error: LocalFileError) -> Self {
        match error {
            LocalFileError::Download(error) => Self::Upstream(error),
            other => Self::FileFetch(other.to_string()),
        }
    }
}

impl From<rate_limit::RateLimitError> for McpError {
    fn from(error: rate_limit::RateLimitError) -> Self {
        match error.retry_after_seconds() {
            Some(retry_after_seconds) => Self::RateLimited { retry_after_seconds },
            None => Self::Internal(anyhow::anyhow!(error)),
        }
    }
}

impl From<McpError> for ErrorData {
    fn from(error: McpError) -> Self {
        if let McpError::Internal(ref inner) = error {
            log::error!("Unhandled error while serving MCP request: {inner:?}");
        }

        ErrorData::new(error.code(), error.to_string(), error.data())
    }
}
