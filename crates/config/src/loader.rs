use std::path::Path;

use anyhow::{Context, bail};

use crate::Config;

pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();

    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read configuration at {}", path.display()))?;

    let config: Config =
        toml::from_str(&content).with_context(|| format!("Failed to parse configuration at {}", path.display()))?;

    validate(&config)?;

    Ok(config)
}

pub(crate) fn validate(config: &Config) -> anyhow::Result<()> {
    if !config.mcp.path.starts_with('/') {
        bail!("mcp.path must start with a slash, got '{}'", config.mcp.path);
    }

    let quota = &config.mcp.rate_limit.tool_calls;

    if config.mcp.rate_limit.enabled && (quota.limit == 0 || quota.interval.is_zero()) {
        bail!("mcp.rate_limit.tool_calls needs a positive limit and interval");
    }

    if config.mcp.cache.ttl.is_zero() {
        bail!("mcp.cache.ttl must be greater than zero");
    }

    if config.mcp.session.ttl.is_zero() {
        bail!("mcp.session.ttl must be greater than zero");
    }

    if http::HeaderName::from_bytes(config.mcp.credential_header.as_bytes()).is_err() {
        bail!("mcp.credential_header '{}' is not a valid header name", config.mcp.credential_header);
    }

    if config.server.auth.is_enforced() && config.server.auth.allowed_origins.is_empty() {
        log::warn!("A bearer token is configured without allowed origins, browser requests will be rejected");
    }

    Ok(())
}
