use std::{path::PathBuf, time::Duration};

use duration_str::deserialize_duration;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Upstream Dealpath REST API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DealpathConfig {
    /// The process-wide default API key, used when neither the session nor the request carries one.
    pub api_key: Option<SecretString>,
    /// Base URL of the REST API.
    pub base_url: Url,
    /// Base URL of the file host used for direct downloads.
    pub files_base_url: Url,
    /// Value of the `Accept` header sent with API requests.
    pub accept: String,
    /// Per-request timeout. File downloads use it as the longest pause between body reads.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    /// Retries for idempotent requests failing with 429 or a 5xx gateway status.
    pub max_retries: u32,
    /// Base delay of the exponential backoff between retries.
    #[serde(deserialize_with = "deserialize_duration")]
    pub retry_backoff: Duration,
    /// OpenAPI document describing the API. The bundled document is used when unset.
    pub openapi_path: Option<PathBuf>,
    /// Cache of per-credential HTTP clients.
    pub client_cache: ClientCacheConfig,
}

impl Default for DealpathConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            files_base_url: default_files_base_url(),
            accept: "application/vnd.dealpath.api.v1+json".to_string(),
            timeout: Duration::from_secs(20),
            max_retries: 3,
            retry_backoff: Duration::from_millis(300),
            openapi_path: None,
            client_cache: ClientCacheConfig::default(),
        }
    }
}

fn default_base_url() -> Url {
    Url::parse("https://api.dealpath.com").expect("default URL should be valid")
}

fn default_files_base_url() -> Url {
    Url::parse("https://files.dealpath.com").expect("default URL should be valid")
}

/// Settings of the per-credential client cache.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientCacheConfig {
    /// Maximum number of cached clients.
    pub max_size: u64,
    /// Clients unused for this long are dropped.
    #[serde(deserialize_with = "deserialize_duration")]
    pub idle_timeout: Duration,
}

impl Default for ClientCacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            idle_timeout: Duration::from_secs(600),
        }
    }
}
