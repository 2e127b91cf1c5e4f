//! Metrics decorator for rate limits
//!
//! Wraps any `RateLimit`, passing every call through unchanged while
//! counting:
//!
//! - `rate_limit_checked` - every `access`
//! - `rate_limit_limited` - accesses told to wait
//! - `rate_limit_error` - accesses that failed

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use conduit_metrics::{Counter, Registry};

use crate::{RateLimit, RateLimitError};

/// `RateLimit` that records metrics for the one it wraps
pub struct MetricsRateLimit<R> {
    inner: R,
    checked: Arc<Counter>,
    limited: Arc<Counter>,
    error: Arc<Counter>,
    closed: AtomicBool,
}

impl<R: RateLimit> MetricsRateLimit<R> {
    pub fn new(inner: R, registry: &dyn Registry) -> Self {
        Self {
            inner,
            checked: registry.counter("rate_limit_checked", &[]),
            limited: registry.counter("rate_limit_limited", &[]),
            error: registry.counter("rate_limit_error", &[]),
            closed: AtomicBool::new(false),
        }
    }

    /// The wrapped rate limit
    #[inline]
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: RateLimit> RateLimit for MetricsRateLimit<R> {
    async fn access(&self) -> Result<Duration, RateLimitError> {
        self.checked.inc();
        let result = self.inner.access().await;
        match &result {
            Ok(wait) if !wait.is_zero() => self.limited.inc(),
            Ok(_) => {}
            Err(e) => {
                self.error.inc();
                tracing::debug!(error = %e, "rate limit access failed");
            }
        }
        result
    }

    /// Close the wrapped rate limit, only on the first call
    async fn close(&self) -> Result<(), RateLimitError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.close().await
    }
}

#[cfg(test)]
#[path = "metrics_test.rs"]
mod metrics_test;
