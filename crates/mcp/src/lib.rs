//! Model Context Protocol gateway in front of the Dealpath REST API.
//!
//! A single `POST` endpoint speaks JSON-RPC (single or batched requests). Tools are the
//! hand-written ones in [`tool`] plus one proxy per GET operation of the OpenAPI document.

#![deny(missing_docs)]

mod cache;
mod content;
mod context;
mod dispatcher;
mod error;
mod files;
mod handler;
mod jsonrpc;
mod legacy;
mod openapi;
mod prompts;
mod registry;
mod resources;
mod session;
mod tool;

use std::sync::Arc;

use axum::{Router, routing::get};

pub use cache::TtlCache;
pub use content::ToolOutput;
pub use context::{AppContext, MetricsSnapshot, Readiness};
pub use error::McpError;
pub use files::{LocalFileError, LocalFileStore};
pub use handler::SESSION_HEADER;
pub use openapi::{BUNDLED_DOCUMENT, ProxyTool};
pub use registry::ToolRegistry;
pub use session::{SessionInfo, SessionStore};

/// Creates the axum router serving the JSON-RPC endpoint and the legacy REST endpoints.
pub fn router(context: Arc<AppContext>) -> Router {
    let path = context.config().path.trim_end_matches('/').to_string();

    log::info!("MCP endpoint listening on {path} with {} tools", context.registry().len());

    Router::new()
        .route(&path, get(handler::get).post(handler::post))
        .route(&format!("{path}/{{operation}}"), get(legacy::operation))
        .route(&format!("{path}/{{operation}}/{{id}}"), get(legacy::operation_with_id))
        .with_state(context)
}
