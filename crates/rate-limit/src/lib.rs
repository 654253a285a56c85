//! Rate limiting of tool calls.
//!
//! Every caller owns a continuous-refill token bucket, keyed by its MCP session when it has one
//! and by its IP address otherwise. Buckets are created lazily on first use and never exceed
//! their configured capacity.

#![deny(missing_docs)]

mod error;
mod manager;
mod request;
mod storage;

pub use error::RateLimitError;
pub use manager::RateLimitManager;
pub use request::{RateLimitRequest, RateLimitRequestBuilder};
pub use storage::{InMemoryStorage, RateLimitResult, RateLimitStorage, StorageError};
