//! Generate reader - emit a fixed batch on a timer
//!
//! Every read yields the configured messages as one batch, one part per
//! message. The first batch is immediate; later ones follow every
//! `interval` (as fast as downstream accepts when the interval is zero).
//! After `count` batches the reader reports end of input; a `count` of zero
//! never ends.

use std::time::Duration;

use async_trait::async_trait;
use conduit_message::Batch;
use tokio::time::{Interval, MissedTickBehavior};

use crate::error::ReadError;
use crate::reader::{AckFn, Reader, noop_ack};

/// Reader producing the same batch repeatedly
#[derive(Debug)]
pub struct GenerateReader {
    batch: Batch,
    count: u64,
    interval: Duration,
    emitted: u64,
    ticker: Option<Interval>,
}

impl GenerateReader {
    pub fn new(messages: Vec<String>, count: u64, interval: Duration) -> Self {
        Self {
            batch: Batch::quick(messages),
            count,
            interval,
            emitted: 0,
            ticker: None,
        }
    }

    /// Number of batches emitted so far
    #[inline]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

#[async_trait]
impl Reader for GenerateReader {
    fn name(&self) -> &'static str {
        "generate"
    }

    async fn connect(&mut self) -> Result<(), ReadError> {
        if !self.interval.is_zero() && self.ticker.is_none() {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.ticker = Some(ticker);
        }
        Ok(())
    }

    async fn read(&mut self) -> Result<(Batch, AckFn), ReadError> {
        if self.count > 0 && self.emitted >= self.count {
            return Err(ReadError::EndOfInput);
        }

        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None if self.interval.is_zero() => tokio::task::yield_now().await,
            None => return Err(ReadError::NotConnected),
        }

        self.emitted += 1;
        Ok((self.batch.clone(), noop_ack()))
    }

    async fn close(&mut self) {
        self.ticker = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_emits_count_batches() {
        let mut reader = GenerateReader::new(messages(&["a", "b"]), 2, Duration::ZERO);
        reader.connect().await.unwrap();

        for _ in 0..2 {
            let (batch, _ack) = reader.read().await.unwrap();
            assert_eq!(batch, Batch::quick(["a", "b"]));
        }
        assert!(matches!(reader.read().await, Err(ReadError::EndOfInput)));
        assert_eq!(reader.emitted(), 2);
    }

    #[tokio::test]
    async fn test_zero_count_is_unbounded() {
        let mut reader = GenerateReader::new(messages(&["x"]), 0, Duration::ZERO);
        reader.connect().await.unwrap();
        for _ in 0..100 {
            assert!(reader.read().await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_interval_paces_reads() {
        let mut reader = GenerateReader::new(messages(&["x"]), 3, Duration::from_millis(30));
        reader.connect().await.unwrap();

        let start = std::time::Instant::now();
        for _ in 0..3 {
            reader.read().await.unwrap();
        }
        // First tick is immediate, then two intervals
        assert!(start.elapsed() >= Duration::from_millis(55));
    }

    #[tokio::test]
    async fn test_read_before_connect() {
        let mut reader = GenerateReader::new(messages(&["x"]), 0, Duration::from_secs(1));
        assert!(matches!(reader.read().await, Err(ReadError::NotConnected)));
    }
}
