//! Rate limit manager implementation.

use config::RateLimitConfig;

use crate::error::RateLimitError;
use crate::request::RateLimitRequest;
use crate::storage::{InMemoryStorage, RateLimitResult, RateLimitStorage};

/// Applies the tool-call quota to incoming requests.
pub struct RateLimitManager<S = InMemoryStorage> {
    config: RateLimitConfig,
    storage: S,
}

impl RateLimitManager {
    /// Create a manager backed by in-memory buckets.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_storage(config, InMemoryStorage::new())
    }
}

impl<S: RateLimitStorage> RateLimitManager<S> {
    /// Create a manager over a custom storage backend.
    pub fn with_storage(config: RateLimitConfig, storage: S) -> Self {
        Self { config, storage }
    }

    /// Check if rate limiting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Take the request's cost from the caller's bucket.
    pub async fn check_request(&self, request: &RateLimitRequest) -> Result<(), RateLimitError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let key = request.key();
        let quota = &self.config.tool_calls;

        match self.storage.check_and_consume(&key, request.cost, quota).await? {
            RateLimitResult::Allowed => Ok(()),
            RateLimitResult::Limited { retry_after } => Err(RateLimitError::LimitExceeded { retry_after }),
            RateLimitResult::OverCapacity => Err(RateLimitError::InsufficientCapacity {
                cost: request.cost.get(),
                capacity: quota.limit,
            }),
        }
    }
}
