//! In-memory rate limit storage using the governor crate.
//!
//! governor implements GCRA, which is equivalent to a continuous-refill token bucket: the burst
//! size is the bucket capacity and the replenish period is the time to refill a single token.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use config::RateLimitQuota;
use dashmap::DashMap;
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{InsufficientCapacity, Quota, RateLimiter};
use mini_moka::sync::Cache;
use tokio::sync::Mutex;

use super::{RateLimitResult, RateLimitStorage, StorageError};

type KeyedRateLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// In-memory rate limit storage implementation.
pub struct InMemoryStorage {
    /// Rate limiters by quota configuration. Each limiter tracks one bucket per key.
    limiters: Cache<String, Arc<KeyedRateLimiter>>,
    /// Per-configuration locks, so a limiter is only created once.
    creation_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl InMemoryStorage {
    /// Create a new in-memory storage instance.
    pub fn new() -> Self {
        let limiters = Cache::builder()
            .max_capacity(1000)
            .time_to_idle(Duration::from_secs(3600))
            .build();

        Self {
            limiters,
            creation_locks: DashMap::new(),
        }
    }

    async fn limiter_for(&self, quota: &RateLimitQuota) -> Result<Arc<KeyedRateLimiter>, StorageError> {
        let cache_key = format!("{}-{}ms", quota.limit, quota.interval.as_millis());

        if let Some(limiter) = self.limiters.get(&cache_key) {
            return Ok(limiter);
        }

        let creation_lock = self
            .creation_locks
            .entry(cache_key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = creation_lock.lock().await;

        // Somebody else created it while we were waiting for the lock
        if let Some(limiter) = self.limiters.get(&cache_key) {
            drop(guard);
            self.creation_locks.remove(&cache_key);

            return Ok(limiter);
        }

        let limiter = Arc::new(RateLimiter::keyed(governor_quota(quota)?));
        self.limiters.insert(cache_key.clone(), limiter.clone());

        log::debug!("Created rate limiter for configuration {cache_key}");

        drop(guard);
        self.creation_locks.remove(&cache_key);

        Ok(limiter)
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitStorage for InMemoryStorage {
    async fn check_and_consume(
        &self,
        key: &str,
        cost: NonZeroU32,
        quota: &RateLimitQuota,
    ) -> Result<RateLimitResult, StorageError> {
        let limiter = self.limiter_for(quota).await?;

        match limiter.check_key_n(&key.to_string(), cost) {
            Ok(Ok(())) => {
                log::debug!("Request allowed for key '{key}', consumed {cost} token(s)");
                Ok(RateLimitResult::Allowed)
            }
            Ok(Err(not_until)) => {
                let retry_after = not_until.wait_time_from(DefaultClock::default().now());
                log::debug!("Request blocked for key '{key}', retry after {retry_after:?}");

                Ok(RateLimitResult::Limited { retry_after })
            }
            Err(InsufficientCapacity(capacity)) => {
                log::warn!("Request for key '{key}' costs {cost} tokens but the bucket only holds {capacity}");
                Ok(RateLimitResult::OverCapacity)
            }
        }
    }
}

/// Maps a capacity/refill-interval quota onto governor's burst/period quota.
fn governor_quota(quota: &RateLimitQuota) -> Result<Quota, StorageError> {
    let burst = NonZeroU32::new(quota.limit)
        .ok_or_else(|| StorageError::Internal("Rate limit capacity must be greater than zero".to_string()))?;

    let period = quota.refill_period();

    let quota = Quota::with_period(period)
        .ok_or_else(|| StorageError::Internal(format!("Invalid refill period: {period:?}")))?
        .allow_burst(burst);

    Ok(quota)
}
