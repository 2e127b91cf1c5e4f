//! Writer outputs - adapt a simple batch writer into a `Streamed` output
//!
//! A `Writer` only knows how to connect, write one batch and close.
//! `WriterOutput` supplies the rest: the consume loop, connection retries,
//! acknowledgments, metrics and teardown.
//!
//! ```text
//! rx ──> WriterOutput ──write(&Batch)──> Writer
//!              │
//!              └── ack(write result)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut output = WriterOutput::new(StdoutWriter::new(None), registry.as_ref());
//! output.consume(rx)?;
//! ```

mod drop;
mod stdout;


use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use conduit_component::{Closable, ComponentError, ConsumeLoop, Lifecycle, Streamed, next_transaction};
use conduit_message::{Batch, DeliveryError, TransactionRx};
use conduit_metrics::{Counter, Registry, Timer};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub use drop::DropWriter;
pub use stdout::StdoutWriter;

/// Wait between failed connection attempts
pub const CONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Destination a `WriterOutput` delivers to
#[async_trait]
pub trait Writer: Send + 'static {
    /// Writer name for logs and metric labels
    fn name(&self) -> &'static str;

    /// Establish the connection, called until it succeeds
    async fn connect(&mut self) -> Result<(), DeliveryError>;

    /// Deliver one batch
    async fn write(&mut self, batch: &Batch) -> Result<(), DeliveryError>;

    /// Release the connection
    async fn close(&mut self);
}

#[derive(Debug, Clone)]
struct WriterMetrics {
    sent: Arc<Counter>,
    batch_sent: Arc<Counter>,
    error: Arc<Counter>,
    latency: Arc<Timer>,
}

impl WriterMetrics {
    fn new(registry: &dyn Registry, name: &str) -> Self {
        let labels = [("output", name)];
        Self {
            sent: registry.counter("output_sent", &labels),
            batch_sent: registry.counter("output_batch_sent", &labels),
            error: registry.counter("output_error", &labels),
            latency: registry.timer("output_latency_ns", &labels),
        }
    }
}

/// `Streamed` output driving a `Writer`
pub struct WriterOutput<W: Writer> {
    name: &'static str,
    consume_loop: ConsumeLoop,
    connected: Arc<AtomicBool>,
    _writer: std::marker::PhantomData<fn() -> W>,
}

impl<W: Writer> WriterOutput<W> {
    /// Wrap `writer`; must be called inside a tokio runtime
    pub fn new(writer: W, registry: &dyn Registry) -> Self {
        Self::with_backoff(writer, registry, CONNECT_BACKOFF)
    }

    /// Wrap `writer` with a custom wait between connection attempts
    pub fn with_backoff(writer: W, registry: &dyn Registry, backoff: Duration) -> Self {
        let name = writer.name();
        let metrics = WriterMetrics::new(registry, name);
        let connected = Arc::new(AtomicBool::new(false));
        let writer = Arc::new(Mutex::new(writer));

        let lifecycle = Lifecycle::new();
        let close = lifecycle.close_token();

        let body = {
            let writer = Arc::clone(&writer);
            let connected = Arc::clone(&connected);
            move |rx| run(rx, writer, connected, close, metrics, backoff)
        };

        let teardown = {
            let connected = Arc::clone(&connected);
            async move {
                writer.lock().await.close().await;
                connected.store(false, Ordering::Release);
                tracing::info!(output = name, "writer output stopped");
            }
        };

        Self {
            name,
            consume_loop: ConsumeLoop::spawn("writer_output", lifecycle, body, teardown),
            connected,
            _writer: std::marker::PhantomData,
        }
    }

    /// Writer name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Connect, retrying until success or close
///
/// Returns `false` if close came first.
async fn connect<W: Writer>(writer: &mut W, close: &CancellationToken, backoff: Duration) -> bool {
    loop {
        let result = tokio::select! {
            biased;
            _ = close.cancelled() => return false,
            result = writer.connect() => result,
        };

        match result {
            Ok(()) => return true,
            Err(e) => {
                tracing::warn!(output = writer.name(), error = %e, "writer connect failed, retrying");
                tokio::select! {
                    _ = close.cancelled() => return false,
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }
    }
}

async fn run<W: Writer>(
    mut rx: TransactionRx,
    writer: Arc<Mutex<W>>,
    connected: Arc<AtomicBool>,
    close: CancellationToken,
    metrics: WriterMetrics,
    backoff: Duration,
) {
    let mut writer = writer.lock().await;
    if !connect(&mut *writer, &close, backoff).await {
        return;
    }
    connected.store(true, Ordering::Release);
    tracing::info!(output = writer.name(), "writer output connected");

    while let Some(transaction) = next_transaction(&mut rx, &close).await {
        let started = Instant::now();
        let result = writer.write(transaction.payload()).await;

        match &result {
            Ok(()) => {
                metrics.sent.add(transaction.payload().collapsed_count() as u64);
                metrics.batch_sent.inc();
                metrics.latency.record_since(started);
            }
            Err(e) => {
                metrics.error.inc();
                tracing::debug!(output = writer.name(), error = %e, "write failed");
            }
        }

        transaction.ack(result);
    }
}

#[async_trait]
impl<W: Writer> Closable for WriterOutput<W> {
    fn close_async(&self) {
        self.consume_loop.lifecycle().trigger_close();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), ComponentError> {
        self.consume_loop.lifecycle().wait_for_close(timeout).await
    }
}

impl<W: Writer> Streamed for WriterOutput<W> {
    fn consume(&mut self, rx: TransactionRx) -> Result<(), ComponentError> {
        self.consume_loop.consume(rx)
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}
