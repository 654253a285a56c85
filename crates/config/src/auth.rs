use secrecy::SecretString;
use serde::Deserialize;

/// Static bearer-token protection for the MCP endpoint.
///
/// When `token` is unset the endpoint is open, which is the local development mode.
/// When set, every `POST` to the MCP path must carry `Authorization: Bearer <token>`,
/// and a request with an `Origin` header must come from one of `allowed_origins`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// The shared bearer token.
    pub token: Option<SecretString>,
    /// Origins accepted on authenticated requests, compared verbatim with the `Origin` header.
    pub allowed_origins: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: None,
            allowed_origins: vec!["http://127.0.0.1".to_string(), "http://localhost".to_string()],
        }
    }
}

impl AuthConfig {
    /// Returns whether bearer authentication is enforced.
    pub fn is_enforced(&self) -> bool {
        self.token.is_some()
    }

    /// Returns whether the given origin is in the allowed set.
    pub fn allows_origin(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}
