use std::{borrow::Cow, collections::BTreeMap, sync::Arc, time::Instant};

use anyhow::Context;
use config::{Config, McpConfig};
use dealpath::{ClientFactory, ClientPool, DealpathApi};
use rate_limit::RateLimitManager;
use secrecy::SecretString;
use serde::Serialize;
use telemetry::metrics::{ToolCallStats, ToolStatsSnapshot};
use url::Url;

use crate::{cache::TtlCache, error::McpError, files::LocalFileStore, openapi, registry::ToolRegistry, session::SessionStore};

/// Shared state of the gateway. One instance serves every request.
pub struct AppContext {
    config: McpConfig,
    default_credential: Option<SecretString>,
    public_url: Option<Url>,
    sessions: SessionStore,
    cache: TtlCache,
    registry: ToolRegistry,
    clients: Arc<dyn ClientFactory>,
    files: LocalFileStore,
    rate_limit: RateLimitManager,
    stats: ToolCallStats,
    started_at: Instant,
}

/// Body of `GET /metrics`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Seconds since the context was built.
    pub uptime_seconds: u64,
    /// Live sessions, after sweeping expired ones.
    pub sessions: usize,
    /// Entries in the entity cache, expired ones included until read.
    pub cache_entries: usize,
    /// Call statistics per tool name.
    pub tools: BTreeMap<String, ToolStatsSnapshot>,
}

/// Outcome of the readiness checks.
#[derive(Debug, Serialize)]
pub struct Readiness {
    /// At least one tool is registered.
    pub tools: bool,
    /// The storage root exists or could be created.
    pub storage: bool,
}

impl Readiness {
    /// Whether every check passed.
    pub fn is_ready(&self) -> bool {
        self.tools && self.storage
    }
}

impl AppContext {
    /// Builds the context from configuration, loading the OpenAPI document and the upstream client pool.
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let document = match &config.dealpath.openapi_path {
            Some(path) => Cow::Owned(
                tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read OpenAPI document {}", path.display()))?,
            ),
            None => Cow::Borrowed(openapi::BUNDLED_DOCUMENT),
        };

        let registry = ToolRegistry::new(&document)?;
        let clients = ClientPool::new(&config.dealpath).context("Failed to build the Dealpath client")?;

        Ok(Self::with_client_factory(config, registry, Arc::new(clients)))
    }

    /// Builds the context around a caller-provided client factory.
    pub fn with_client_factory(config: &Config, registry: ToolRegistry, clients: Arc<dyn ClientFactory>) -> Self {
        Self {
            config: config.mcp.clone(),
            default_credential: config.dealpath.api_key.clone(),
            public_url: config.storage.public_url.clone(),
            sessions: SessionStore::new(config.mcp.session.clone()),
            cache: TtlCache::new(config.mcp.cache.ttl),
            registry,
            clients,
            files: LocalFileStore::new(config.storage.root.clone()),
            rate_limit: RateLimitManager::new(config.mcp.rate_limit.clone()),
            stats: ToolCallStats::new(),
            started_at: Instant::now(),
        }
    }

    /// MCP endpoint settings.
    pub fn config(&self) -> &McpConfig {
        &self.config
    }

    /// The session store.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// The entity cache.
    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    /// The merged tool registry.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Storage of downloaded files.
    pub fn files(&self) -> &LocalFileStore {
        &self.files
    }

    /// Per-tool call statistics.
    pub fn stats(&self) -> &ToolCallStats {
        &self.stats
    }

    pub(crate) fn rate_limit(&self) -> &RateLimitManager {
        &self.rate_limit
    }

    pub(crate) fn public_url(&self) -> Option<&Url> {
        self.public_url.as_ref()
    }

    /// Picks the upstream client for a call: the caller's credential, else the configured default.
    pub(crate) fn api(&self, credential: Option<&SecretString>) -> Result<Arc<dyn DealpathApi>, McpError> {
        let credential = credential
            .or(self.default_credential.as_ref())
            .ok_or(McpError::MissingCredential)?;

        Ok(self.clients.client(credential)?)
    }

    /// Sweeps expired sessions and reports counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        let swept = self.sessions.cleanup_expired();

        if swept > 0 {
            log::debug!("Swept {swept} expired sessions");
        }

        MetricsSnapshot {
            uptime_seconds: self.started_at.elapsed().as_secs(),
            sessions: self.sessions.len(),
            cache_entries: self.cache.len(),
            tools: self.stats.snapshot(),
        }
    }

    /// Runs the readiness checks.
    pub async fn readiness(&self) -> Readiness {
        let storage = match self.files.ensure_root().await {
            Ok(()) => true,
            Err(error) => {
                log::warn!("Storage root {} is not usable: {error}", self.files.root().display());
                false
            }
        };

        Readiness {
            tools: !self.registry.is_empty(),
            storage,
        }
    }
}
