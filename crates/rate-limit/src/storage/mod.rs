//! Storage backends for rate limiting.

use std::{num::NonZeroU32, time::Duration};

use config::RateLimitQuota;

pub mod memory;

pub use memory::InMemoryStorage;

/// Result type for rate limit checks.
#[derive(Debug, PartialEq)]
pub enum RateLimitResult {
    /// The tokens were consumed.
    Allowed,
    /// The bucket is short of tokens, retry after the given time.
    Limited {
        /// Time until the bucket holds enough tokens.
        retry_after: Duration,
    },
    /// The cost exceeds the bucket capacity and can never be satisfied.
    OverCapacity,
}

/// Trait for rate limit storage backends.
#[allow(async_fn_in_trait)]
pub trait RateLimitStorage: Send + Sync {
    /// Atomically take `cost` tokens from the bucket identified by `key`.
    async fn check_and_consume(
        &self,
        key: &str,
        cost: NonZeroU32,
        quota: &RateLimitQuota,
    ) -> Result<RateLimitResult, StorageError>;
}

/// Errors that can occur in storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Internal storage error.
    #[error("Storage error: {0}")]
    Internal(String),
}
