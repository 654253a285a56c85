//! Error types for rate limiting.

use crate::storage::StorageError;
use std::time::Duration;

/// Errors that can occur during rate limiting.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// The caller's bucket does not hold enough tokens.
    #[error("Rate limit exceeded")]
    LimitExceeded {
        /// Time until enough tokens are available.
        retry_after: Duration,
    },

    /// The request costs more than the bucket can ever hold.
    #[error("Request cost {cost} exceeds the rate limit capacity of {capacity}")]
    InsufficientCapacity {
        /// Tokens requested.
        cost: u32,
        /// Bucket capacity.
        capacity: u32,
    },

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl RateLimitError {
    /// Get the retry-after duration if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::LimitExceeded { retry_after } => Some(*retry_after),
            Self::InsufficientCapacity { .. } | Self::Storage(_) => None,
        }
    }

    /// The retry hint in whole seconds, rounded up and never below one.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        self.retry_after()
            .map(|retry_after| retry_after.as_secs_f64().ceil().max(1.0) as u64)
    }
}
