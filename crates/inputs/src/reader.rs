//! Reader input - adapt a batch reader into an `Input`
//!
//! The reading task starts as soon as the input is built. For every batch it
//! creates a transaction, forwards it downstream and hands the
//! acknowledgment to a tracked task that reports it back through the
//! reader's `AckFn`. Several acknowledgments may be outstanding at once.
//!
//! On end of input or close the task stops reading, drops its sender (the
//! downstream sees end of stream), waits for outstanding acknowledgments,
//! closes the reader and marks the input closed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use conduit_component::{Closable, ComponentError, Forwarded, Input, Lifecycle, await_ack, forward};
use conduit_message::{AckResult, Batch, Transaction, TransactionRx, TransactionTx, transaction_channel};
use conduit_metrics::{Counter, Registry};
use conduit_ratelimit::RateLimit;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::ReadError;

/// Default wait after a failed connect or read
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Callback receiving the downstream acknowledgment of one read
pub type AckFn = Box<dyn FnOnce(AckResult) + Send>;

/// `AckFn` for readers with nothing to acknowledge
pub fn noop_ack() -> AckFn {
    Box::new(|_| {})
}

/// Source a `ReaderInput` pulls batches from
#[async_trait]
pub trait Reader: Send + 'static {
    /// Reader name for logs and metric labels
    fn name(&self) -> &'static str;

    /// Establish the connection, called until it succeeds
    async fn connect(&mut self) -> Result<(), ReadError>;

    /// Read the next batch and the callback for its acknowledgment
    async fn read(&mut self) -> Result<(Batch, AckFn), ReadError>;

    /// Release the connection
    async fn close(&mut self);
}

/// Options for `ReaderInput`
#[derive(Clone)]
pub struct ReaderOptions {
    /// Claimed once before every read
    pub rate_limit: Option<Arc<dyn RateLimit>>,
    /// Wait after a failed connect or read
    pub backoff: Duration,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            rate_limit: None,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl ReaderOptions {
    /// Set the rate limit
    pub fn with_rate_limit(mut self, rate_limit: Arc<dyn RateLimit>) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    /// Set the backoff
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

#[derive(Debug, Clone)]
struct InputMetrics {
    received: Arc<Counter>,
    batch_received: Arc<Counter>,
    error: Arc<Counter>,
}

impl InputMetrics {
    fn new(registry: &dyn Registry, name: &str) -> Self {
        let labels = [("input", name)];
        Self {
            received: registry.counter("input_received", &labels),
            batch_received: registry.counter("input_batch_received", &labels),
            error: registry.counter("input_error", &labels),
        }
    }
}

/// `Input` driving a `Reader`
pub struct ReaderInput<R: Reader> {
    name: &'static str,
    lifecycle: Lifecycle,
    transactions: Option<TransactionRx>,
    connected: Arc<AtomicBool>,
    _reader: std::marker::PhantomData<fn() -> R>,
}

impl<R: Reader> ReaderInput<R> {
    /// Start reading; must be called inside a tokio runtime
    pub fn new(reader: R, registry: &dyn Registry, options: ReaderOptions) -> Self {
        let name = reader.name();
        let lifecycle = Lifecycle::new();
        let connected = Arc::new(AtomicBool::new(false));
        let (tx, rx) = transaction_channel();

        let task = ReadLoop {
            reader,
            tx,
            close: lifecycle.close_token(),
            connected: Arc::clone(&connected),
            metrics: InputMetrics::new(registry, name),
            options,
        };
        let closed = lifecycle.closed_guard();
        tokio::spawn(async move {
            let _closed = closed;
            task.run().await;
        });

        Self {
            name,
            lifecycle,
            transactions: Some(rx),
            connected,
            _reader: std::marker::PhantomData,
        }
    }

    /// Reader name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

struct ReadLoop<R> {
    reader: R,
    tx: TransactionTx,
    close: CancellationToken,
    connected: Arc<AtomicBool>,
    metrics: InputMetrics,
    options: ReaderOptions,
}

impl<R: Reader> ReadLoop<R> {
    async fn run(mut self) {
        let name = self.reader.name();
        let tracker = TaskTracker::new();

        if self.connect().await {
            tracing::info!(input = name, "reader input connected");
            self.read_until_done(&tracker).await;
        }

        // Downstream sees end of stream while acknowledgments drain
        let Self {
            mut reader,
            tx,
            connected,
            options,
            ..
        } = self;
        drop(tx);

        tracker.close();
        tracker.wait().await;

        reader.close().await;
        if let Some(rate_limit) = options.rate_limit {
            if let Err(e) = rate_limit.close().await {
                tracing::warn!(input = name, error = %e, "rate limit close failed");
            }
        }
        connected.store(false, Ordering::Release);
        tracing::info!(input = name, "reader input stopped");
    }

    /// Connect, retrying until success or close
    ///
    /// Returns `false` if close came first.
    async fn connect(&mut self) -> bool {
        loop {
            let result = tokio::select! {
                biased;
                _ = self.close.cancelled() => return false,
                result = self.reader.connect() => result,
            };

            match result {
                Ok(()) => {
                    self.connected.store(true, Ordering::Release);
                    return true;
                }
                Err(e) => {
                    tracing::warn!(input = self.reader.name(), error = %e, "reader connect failed, retrying");
                    if !sleep_unless_closed(&self.close, self.options.backoff).await {
                        return false;
                    }
                }
            }
        }
    }

    async fn read_until_done(&mut self, tracker: &TaskTracker) {
        let name = self.reader.name();

        loop {
            let rate_limit = self.options.rate_limit.as_deref();
            if !throttle(rate_limit, &self.close, self.options.backoff).await {
                return;
            }

            let read = tokio::select! {
                biased;
                _ = self.close.cancelled() => return,
                read = self.reader.read() => read,
            };

            let (batch, ack_fn) = match read {
                Ok(read) => read,
                Err(ReadError::Timeout) => continue,
                Err(ReadError::EndOfInput) => {
                    tracing::info!(input = name, "reader reached end of input");
                    return;
                }
                Err(ReadError::NotConnected) => {
                    self.connected.store(false, Ordering::Release);
                    tracing::warn!(input = name, "reader lost connection, reconnecting");
                    if !self.connect().await {
                        return;
                    }
                    continue;
                }
                Err(e) => {
                    self.metrics.error.inc();
                    tracing::error!(input = name, error = %e, "read failed");
                    if !sleep_unless_closed(&self.close, self.options.backoff).await {
                        return;
                    }
                    continue;
                }
            };

            let messages = batch.collapsed_count() as u64;
            let (transaction, ack) = Transaction::pending(batch);
            let forwarded = forward(&self.tx, transaction, &self.close).await;

            // Unsent transactions were acknowledged by `forward`, so the
            // waiter still reports them to the reader
            let close = self.close.clone();
            tracker.spawn(async move {
                ack_fn(await_ack(ack, &close).await);
            });

            match forwarded {
                Forwarded::Sent => {
                    self.metrics.received.add(messages);
                    self.metrics.batch_received.inc();
                }
                Forwarded::ShuttingDown => return,
                Forwarded::DownstreamClosed => {
                    tracing::warn!(input = name, "downstream closed, stopping input");
                    return;
                }
            }
        }
    }
}

/// Sleep for `duration`, returning `false` if close came first
async fn sleep_unless_closed(close: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = close.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Wait until the rate limit grants an access
///
/// Returns `false` if close came first.
async fn throttle(
    rate_limit: Option<&dyn RateLimit>,
    close: &CancellationToken,
    backoff: Duration,
) -> bool {
    let Some(rate_limit) = rate_limit else {
        return true;
    };

    loop {
        let access = tokio::select! {
            biased;
            _ = close.cancelled() => return false,
            access = rate_limit.access() => access,
        };

        let wait = match access {
            Ok(wait) if wait.is_zero() => return true,
            Ok(wait) => wait,
            Err(e) => {
                tracing::warn!(error = %e, "rate limit access failed");
                backoff
            }
        };

        if !sleep_unless_closed(close, wait).await {
            return false;
        }
    }
}

#[async_trait]
impl<R: Reader> Closable for ReaderInput<R> {
    fn close_async(&self) {
        self.lifecycle.trigger_close();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), ComponentError> {
        self.lifecycle.wait_for_close(timeout).await
    }
}

impl<R: Reader> Input for ReaderInput<R> {
    fn transactions(&mut self) -> Option<TransactionRx> {
        self.transactions.take()
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[path = "reader_test.rs"]
mod reader_test;
