//! Rate limiting configuration structures.

use duration_str::deserialize_duration;
use serde::Deserialize;
use std::time::Duration;

/// Rate limiting of `tools/call` requests, keyed by session or client IP.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled.
    pub enabled: bool,
    /// The token bucket applied to each caller.
    pub tool_calls: RateLimitQuota,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tool_calls: RateLimitQuota::default(),
        }
    }
}

/// A token bucket quota: `limit` is the bucket capacity, refilled completely over `interval`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitQuota {
    /// Maximum number of calls the bucket holds.
    pub limit: u32,
    /// Time to refill an empty bucket.
    #[serde(deserialize_with = "deserialize_duration")]
    pub interval: Duration,
}

impl Default for RateLimitQuota {
    fn default() -> Self {
        Self {
            limit: 60,
            interval: Duration::from_secs(60),
        }
    }
}

impl RateLimitQuota {
    /// Time between two single-token refills.
    pub fn refill_period(&self) -> Duration {
        self.interval / self.limit.max(1)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::RateLimitQuota;

    #[test]
    fn refill_period_spreads_interval_over_capacity() {
        let quota = RateLimitQuota {
            limit: 10,
            interval: Duration::from_secs(1),
        };

        assert_eq!(quota.refill_period(), Duration::from_millis(100));
    }

    #[test]
    fn quota_parses_human_durations() {
        let quota: RateLimitQuota = toml::from_str("limit = 3\ninterval = \"2m\"").unwrap();

        assert_eq!(quota.limit, 3);
        assert_eq!(quota.interval, Duration::from_secs(120));
    }
}
