use std::time::Duration;

use duration_str::deserialize_duration;
use serde::Deserialize;

use crate::RateLimitConfig;

/// The MCP protocol revision announced by `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Configuration of the MCP JSON-RPC endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct McpConfig {
    /// Whether the MCP endpoint is exposed.
    pub enabled: bool,
    /// The HTTP path of the JSON-RPC endpoint.
    pub path: String,
    /// The protocol version reported to clients.
    pub protocol_version: String,
    /// Header carrying a caller-supplied upstream credential.
    pub credential_header: String,
    /// Session lifecycle settings.
    pub session: SessionConfig,
    /// Entity cache settings.
    pub cache: CacheConfig,
    /// Tool-call rate limiting.
    pub rate_limit: RateLimitConfig,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/mcp".to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            credential_header: "X-Dealpath-Api-Key".to_string(),
            session: SessionConfig::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Session lifecycle settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Inactivity period after which a session is swept.
    #[serde(deserialize_with = "deserialize_duration")]
    pub ttl: Duration,
    /// Number of live sessions above which a sweep runs on session creation.
    pub cleanup_threshold: usize,
    /// Reject non-initialize requests that do not reference a live session.
    pub required: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            cleanup_threshold: 100,
            required: false,
        }
    }
}

/// Entity cache settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Default time-to-live of cached entities.
    #[serde(deserialize_with = "deserialize_duration")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
        }
    }
}
