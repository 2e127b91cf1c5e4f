//! Pipeline - run a processor chain between two transaction streams
//!
//! The pipeline is a `Streamed` toward its upstream and an `Input` toward
//! its downstream. For each inbound transaction:
//!
//! - the chain fails: acknowledge with `DeliveryError::Processing`
//! - the chain yields nothing: acknowledge `Ok(())`
//! - otherwise forward every batch as a new transaction; a tracked task
//!   acknowledges the original with `Ok(())` once all of them succeed, or
//!   with the first failure
//!
//! When the upstream ends or close is signalled the pipeline stops reading,
//! drops its sender (the downstream sees end of stream), waits for the
//! tracked acknowledgments and closes the processors. A forwarded batch is
//! always acknowledged with the downstream's own result, even mid-close.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use conduit_component::{
    Closable, ComponentError, ConsumeLoop, Forwarded, Input, Lifecycle, Streamed, forward,
    next_transaction, reject_pending,
};
use conduit_message::{
    AckReceiver, AckResult, DeliveryError, Transaction, TransactionRx, TransactionTx, transaction_channel,
};
use conduit_metrics::{Counter, Registry, Timer};
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::chain::Chain;

#[derive(Debug, Clone)]
struct PipelineMetrics {
    batch_received: Arc<Counter>,
    batch_sent: Arc<Counter>,
    dropped: Arc<Counter>,
    error: Arc<Counter>,
    latency: Arc<Timer>,
}

impl PipelineMetrics {
    fn new(registry: &dyn Registry) -> Self {
        Self {
            batch_received: registry.counter("processor_batch_received", &[]),
            batch_sent: registry.counter("processor_batch_sent", &[]),
            dropped: registry.counter("processor_dropped", &[]),
            error: registry.counter("processor_error", &[]),
            latency: registry.timer("processor_latency_ns", &[]),
        }
    }
}

/// Processing stage between an input and an output
pub struct Pipeline {
    consume_loop: ConsumeLoop,
    transactions: Option<TransactionRx>,
}

impl Pipeline {
    /// Build the pipeline; must be called inside a tokio runtime
    pub fn new(chain: Chain, registry: &dyn Registry) -> Self {
        let chain = Arc::new(chain);
        let metrics = PipelineMetrics::new(registry);
        let (tx, rx) = transaction_channel();

        let lifecycle = Lifecycle::new();
        let close = lifecycle.close_token();

        tracing::info!(processors = ?chain.names(), "pipeline created");

        let body = {
            let chain = Arc::clone(&chain);
            move |inbound| run(inbound, tx, chain, close, metrics)
        };

        let teardown = async move {
            chain.close().await;
            tracing::info!("pipeline stopped");
        };

        Self {
            consume_loop: ConsumeLoop::spawn("pipeline", lifecycle, body, teardown),
            transactions: Some(rx),
        }
    }
}

async fn run(
    mut rx: TransactionRx,
    tx: TransactionTx,
    chain: Arc<Chain>,
    close: CancellationToken,
    metrics: PipelineMetrics,
) {
    let tracker = TaskTracker::new();

    while let Some(transaction) = next_transaction(&mut rx, &close).await {
        let (batch, ack) = transaction.into_parts();
        metrics.batch_received.inc();

        let started = Instant::now();
        let processed = tokio::select! {
            biased;
            _ = close.cancelled() => None,
            processed = chain.process(batch) => Some(processed),
        };
        let Some(processed) = processed else {
            ack.send(Err(DeliveryError::ShuttingDown));
            break;
        };
        metrics.latency.record_since(started);

        let batches = match processed {
            Ok(batches) => batches,
            Err(e) => {
                metrics.error.inc();
                tracing::warn!(error = %e, "processing failed");
                ack.send(Err(DeliveryError::processing(e.to_string())));
                continue;
            }
        };

        if batches.is_empty() {
            metrics.dropped.inc();
            ack.send(Ok(()));
            continue;
        }

        let mut pending = Vec::with_capacity(batches.len());
        let mut stopped = None;
        for batch in batches {
            let (transaction, result) = Transaction::pending(batch);
            let outcome = forward(&tx, transaction, &close).await;
            pending.push(result);
            if outcome.is_sent() {
                metrics.batch_sent.inc();
            } else {
                stopped = Some(outcome);
                break;
            }
        }

        // Batches that were not sent were acknowledged by `forward`; sent
        // ones report whatever the downstream decides, close or not
        tracker.spawn(async move {
            ack.send(aggregate(pending).await);
        });

        match stopped {
            None => {}
            Some(Forwarded::DownstreamClosed) => {
                tracing::warn!("downstream closed, stopping pipeline");
                break;
            }
            Some(_) => break,
        }
    }

    let rejected = reject_pending(&mut rx);
    if rejected > 0 {
        tracing::debug!(rejected, "rejected buffered transactions");
    }
    drop(tx);

    tracker.close();
    tracker.wait().await;
}

/// Fold the acknowledgments of derived transactions into one result
///
/// `Ok(())` only if every one succeeded; otherwise the first failure in
/// forwarding order.
async fn aggregate(pending: Vec<AckReceiver>) -> AckResult {
    let results = join_all(pending).await;
    results.into_iter().find(Result::is_err).unwrap_or(Ok(()))
}

#[async_trait]
impl Closable for Pipeline {
    fn close_async(&self) {
        self.consume_loop.lifecycle().trigger_close();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), ComponentError> {
        self.consume_loop.lifecycle().wait_for_close(timeout).await
    }
}

impl Streamed for Pipeline {
    fn consume(&mut self, rx: TransactionRx) -> Result<(), ComponentError> {
        self.consume_loop.consume(rx)
    }

    fn connected(&self) -> bool {
        !self.consume_loop.lifecycle().is_closed()
    }
}

impl Input for Pipeline {
    fn transactions(&mut self) -> Option<TransactionRx> {
        self.transactions.take()
    }

    fn connected(&self) -> bool {
        !self.consume_loop.lifecycle().is_closed()
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
