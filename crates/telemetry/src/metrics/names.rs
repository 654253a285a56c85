//! Metric names, following OpenTelemetry semantic conventions where one exists
//! See: https://opentelemetry.io/docs/specs/semconv/http/http-metrics/

/// HTTP server request duration in milliseconds
pub const HTTP_SERVER_REQUEST_DURATION: &str = "http.server.request.duration";

/// Duration of a `tools/call` request in milliseconds, with the tool name and outcome as attributes
pub const MCP_TOOL_CALL_DURATION: &str = "mcp.tool.call.duration";
