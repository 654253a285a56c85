use std::sync::Arc;

use config::DealpathConfig;
use mini_moka::sync::Cache;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::{DealpathApi, DealpathClient, UpstreamError, client};

/// Selects the upstream client used for a credential.
pub trait ClientFactory: Send + Sync {
    /// Returns a client authenticating with `credential`.
    fn client(&self, credential: &SecretString) -> Result<Arc<dyn DealpathApi>, UpstreamError>;
}

/// Keeps one [`DealpathClient`] per credential so connections are reused across requests.
pub struct ClientPool {
    cache: Cache<String, Arc<DealpathClient>>,
    plain: reqwest::Client,
    config: DealpathConfig,
}

impl ClientPool {
    /// Creates an empty pool.
    pub fn new(config: &DealpathConfig) -> Result<Self, UpstreamError> {
        let cache = Cache::builder()
            .max_capacity(config.client_cache.max_size)
            .time_to_idle(config.client_cache.idle_timeout)
            .build();

        Ok(Self {
            cache,
            plain: client::plain_client(config)?,
            config: config.clone(),
        })
    }

    fn get_or_create(&self, credential: &SecretString) -> Result<Arc<DealpathClient>, UpstreamError> {
        // Keyed by a digest so raw credentials never live in the cache
        let cache_key = hash_credential(credential.expose_secret());

        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }

        let client = Arc::new(DealpathClient::with_plain_client(
            &self.config,
            credential,
            self.plain.clone(),
        )?);

        self.cache.insert(cache_key, client.clone());

        Ok(client)
    }
}

impl ClientFactory for ClientPool {
    fn client(&self, credential: &SecretString) -> Result<Arc<dyn DealpathApi>, UpstreamError> {
        Ok(self.get_or_create(credential)?)
    }
}

fn hash_credential(credential: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(credential.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use config::DealpathConfig;
    use secrecy::SecretString;

    use super::ClientPool;
    use crate::UpstreamError;

    #[test]
    fn reuses_clients_per_credential() {
        let pool = ClientPool::new(&DealpathConfig::default()).unwrap();

        let first = pool.get_or_create(&SecretString::from("key-a")).unwrap();
        let again = pool.get_or_create(&SecretString::from("key-a")).unwrap();
        let other = pool.get_or_create(&SecretString::from("key-b")).unwrap();

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn rejects_credentials_that_are_not_header_safe() {
        let pool = ClientPool::new(&DealpathConfig::default()).unwrap();
        let result = pool.get_or_create(&SecretString::from("line\nbreak"));

        assert!(matches!(result, Err(UpstreamError::InvalidCredential)));
    }
}
