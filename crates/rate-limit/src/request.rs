//! Request information for rate limiting.

use std::{net::IpAddr, num::NonZeroU32};

/// Information about a request that needs to be rate limited.
#[derive(Debug, Clone)]
pub struct RateLimitRequest {
    /// MCP session the request belongs to.
    pub session_id: Option<String>,
    /// IP address of the request origin.
    pub ip: Option<IpAddr>,
    /// Tokens the request consumes.
    pub cost: NonZeroU32,
}

impl RateLimitRequest {
    /// Create a new builder for a rate limit request.
    pub fn builder() -> RateLimitRequestBuilder {
        RateLimitRequestBuilder::default()
    }

    /// The bucket key: the session when present, else the client IP.
    pub fn key(&self) -> String {
        match (&self.session_id, self.ip) {
            (Some(session_id), _) => format!("session:{session_id}"),
            (None, Some(ip)) => format!("ip:{ip}"),
            (None, None) => "anonymous".to_string(),
        }
    }
}

/// Builder for creating rate limit requests.
#[derive(Debug, Default)]
pub struct RateLimitRequestBuilder {
    session_id: Option<String>,
    ip: Option<IpAddr>,
    cost: Option<NonZeroU32>,
}

impl RateLimitRequestBuilder {
    /// Set the session id.
    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the session id if one is present.
    pub fn maybe_session(mut self, session_id: Option<impl Into<String>>) -> Self {
        self.session_id = session_id.map(Into::into);
        self
    }

    /// Set the IP address.
    pub fn ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Set the IP address if one is known.
    pub fn maybe_ip(mut self, ip: Option<IpAddr>) -> Self {
        self.ip = ip;
        self
    }

    /// Set how many tokens the request consumes. Defaults to one.
    pub fn cost(mut self, cost: NonZeroU32) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Build the rate limit request.
    pub fn build(self) -> RateLimitRequest {
        RateLimitRequest {
            session_id: self.session_id,
            ip: self.ip,
            cost: self.cost.unwrap_or(NonZeroU32::MIN),
        }
    }
}
