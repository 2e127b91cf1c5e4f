//! Conduit - Rate Limit
//!
//! A `RateLimit` tells its caller how long to wait before the next access.
//! It never sleeps itself, so callers can race the wait against their own
//! close signal.
//!
//! # Example
//!
//! ```ignore
//! let limit = MetricsRateLimit::new(LocalRateLimit::new(100, Duration::from_secs(1)), registry.as_ref());
//!
//! let wait = limit.access().await?;
//! if !wait.is_zero() {
//!     tokio::time::sleep(wait).await;
//! }
//! ```

mod local;
mod metrics;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use local::LocalRateLimit;
pub use metrics::MetricsRateLimit;

/// Rate limit errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    /// The rate limit was closed
    #[error("rate limit is closed")]
    Closed,

    /// Backing store failed
    #[error("rate limit failed: {0}")]
    Other(String),
}

/// A shared access budget
#[async_trait]
pub trait RateLimit: Send + Sync {
    /// Claim one access
    ///
    /// Returns how long the caller must wait before trying again; zero means
    /// the access was granted.
    async fn access(&self) -> Result<Duration, RateLimitError>;

    /// Release the rate limit
    async fn close(&self) -> Result<(), RateLimitError>;
}
