//! Small TTL cache for upstream entities and their rendered projections.

use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::time::Instant;

struct Entry {
    expires_at: Instant,
    value: Value,
}

/// Key→value map whose entries disappear once their TTL has passed.
///
/// Expiry is lazy: an expired entry is evicted by the read that finds it.
pub struct TtlCache {
    entries: DashMap<String, Entry>,
    default_ttl: Duration,
}

impl TtlCache {
    /// Creates an empty cache.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// Returns the value under `key` unless it expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();

        {
            let entry = self.entries.get(key)?;

            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }

        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);

        None
    }

    /// Stores `value` under `key` with the default TTL, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let entry = Entry {
            expires_at: Instant::now() + ttl,
            value,
        };

        self.entries.insert(key.into(), entry);
    }

    /// Number of stored entries, expired ones not yet evicted included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Key of a deal's raw JSON envelope.
pub(crate) fn deal_json_key(deal_id: &str) -> String {
    format!("deal:{deal_id}:json")
}

/// Key of a deal's rendered markdown.
pub(crate) fn deal_markdown_key(deal_id: &str) -> String {
    format!("deal:{deal_id}:md")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::TtlCache;

    #[tokio::test(start_paused = true)]
    async fn expired_entries_are_absent_and_evicted() {
        let cache = TtlCache::new(Duration::from_secs(300));
        cache.set_with_ttl("deal:1:json", json!({"deal": {}}), Duration::from_secs(1));

        assert_eq!(cache.get("deal:1:json"), Some(json!({"deal": {}})));

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("deal:1:json"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_overwrites_and_renews() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.set("k", json!(1));

        tokio::time::advance(Duration::from_secs(8)).await;
        cache.set("k", json!(2));

        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get("k"), Some(json!(2)));
    }

    #[tokio::test]
    async fn missing_keys() {
        let cache = TtlCache::new(Duration::from_secs(10));

        assert_eq!(cache.get("nope"), None);
    }
}
