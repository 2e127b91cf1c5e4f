//! In-process rate limit
//!
//! A bucket of `count` accesses refilled in full every `interval`. An empty
//! bucket reports the time left until the next refill.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{RateLimit, RateLimitError};

#[derive(Debug)]
struct Bucket {
    remaining: u32,
    last_refill: Instant,
    closed: bool,
}

/// Rate limit of `count` accesses per `interval`
#[derive(Debug)]
pub struct LocalRateLimit {
    count: u32,
    interval: Duration,
    bucket: Mutex<Bucket>,
}

impl LocalRateLimit {
    /// Create a full bucket
    ///
    /// A `count` of zero is treated as one.
    pub fn new(count: u32, interval: Duration) -> Self {
        let count = count.max(1);
        Self {
            count,
            interval,
            bucket: Mutex::new(Bucket {
                remaining: count,
                last_refill: Instant::now(),
                closed: false,
            }),
        }
    }

    fn claim(&self, now: Instant) -> Result<Duration, RateLimitError> {
        let mut bucket = self.bucket.lock();
        if bucket.closed {
            return Err(RateLimitError::Closed);
        }

        let elapsed = now.saturating_duration_since(bucket.last_refill);
        if elapsed >= self.interval {
            bucket.remaining = self.count;
            bucket.last_refill = now;
        }

        if bucket.remaining == 0 {
            return Ok(self.interval.saturating_sub(elapsed));
        }

        bucket.remaining -= 1;
        Ok(Duration::ZERO)
    }
}

#[async_trait]
impl RateLimit for LocalRateLimit {
    async fn access(&self) -> Result<Duration, RateLimitError> {
        self.claim(Instant::now())
    }

    async fn close(&self) -> Result<(), RateLimitError> {
        self.bucket.lock().closed = true;
        Ok(())
    }
}
