//! Configuration structures mapping the `dealpath-mcp.toml` file.

#![deny(missing_docs)]

mod auth;
mod cors;
mod dealpath;
mod loader;
mod mcp;
mod rate_limit;
mod storage;
mod telemetry;

use std::{borrow::Cow, net::SocketAddr, path::Path, path::PathBuf};

pub use auth::AuthConfig;
pub use cors::*;
pub use dealpath::{ClientCacheConfig, DealpathConfig};
pub use mcp::{CacheConfig, McpConfig, PROTOCOL_VERSION, SessionConfig};
pub use rate_limit::{RateLimitConfig, RateLimitQuota};
pub use storage::StorageConfig;
pub use telemetry::{ExportersConfig, OtlpExporterConfig, OtlpProtocol, TelemetryConfig};

use serde::Deserialize;

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Model Context Protocol endpoint settings.
    #[serde(default)]
    pub mcp: McpConfig,
    /// Upstream Dealpath API settings.
    #[serde(default)]
    pub dealpath: DealpathConfig,
    /// Local storage for downloaded files.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }

    /// Checks the values that cannot be expressed through the types alone.
    pub fn validate(&self) -> anyhow::Result<()> {
        loader::validate(self)
    }
}

/// HTTP server configuration settings.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// The socket address the server should listen on.
    pub listen_address: Option<SocketAddr>,
    /// TLS configuration for secure connections.
    pub tls: Option<TlsServerConfig>,
    /// Health endpoint configuration.
    #[serde(default)]
    pub health: HealthConfig,
    /// CORS configuration. When absent, a restrictive policy is derived from the allowed origins.
    pub cors: Option<CorsConfig>,
    /// Static bearer token and origin policy for the MCP endpoint.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// TLS configuration for secure connections.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TlsServerConfig {
    /// Path to the TLS certificate PEM file.
    pub certificate: PathBuf,
    /// Path to the TLS private key PEM file.
    pub key: PathBuf,
}

/// Health endpoint configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthConfig {
    /// Whether the health endpoints are enabled.
    pub enabled: bool,
    /// The base path of the health endpoints. `/ready` and `/live` are nested under it.
    pub path: Cow<'static, str>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        HealthConfig {
            enabled: true,
            path: Cow::Borrowed("/health"),
        }
    }
}
