//! Conduit - Broker
//!
//! Routes one inbound transaction stream across N downstream components.
//!
//! # Architecture
//!
//! ```text
//!                        ┌──[tx 0]──> output 0
//! upstream ──rx──> Broker├──[tx 1]──> output 1
//!                        └──[tx N]──> output N
//! ```
//!
//! The broker owns one single-slot channel per downstream and is the only
//! writer on it. Forwarding waits for the chosen downstream to accept, so a
//! slow output stalls its own turn and, through the broker, the upstream.
//!
//! # Patterns
//!
//! | Pattern | Delivery | Acknowledgment |
//! |---------|----------|----------------|
//! | `RoundRobin` | transaction `i` to output `i mod N` | passed through untouched |
//! | `FanOut` | every transaction to every output | aggregated (`Partial` when several fail) |
//! | `Greedy` | whichever output has capacity first | passed through untouched |
//! | `Try` | output 0, failing over in order | first success or last error |
//!
//! # Shutdown
//!
//! Close, or the upstream ending, stops the routing loop. The broker then
//! drops its downstream senders, signals every output to close, and waits
//! for all of them concurrently. The caller's own `wait_for_close` bounds
//! that wait.
//!
//! A transaction already handed to an output is acknowledged upstream with
//! that output's result, never with `ShuttingDown`. Acknowledgments still
//! outstanding when close arrives are awaited after the outputs close, so an
//! output holding a transaction until its own close cannot stall shutdown.
//!
//! # Example
//!
//! ```ignore
//! let outputs: Vec<Box<dyn Streamed>> = vec![Box::new(a), Box::new(b)];
//! let mut broker = Broker::new(Pattern::RoundRobin, outputs, registry.as_ref())?;
//! broker.consume(rx)?;
//!
//! broker.close_async();
//! broker.wait_for_close(Duration::from_secs(5)).await?;
//! ```

mod fan_out;
mod greedy;
mod metrics;
mod round_robin;
mod try_outputs;


use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conduit_component::{Closable, ComponentError, ConsumeLoop, Lifecycle, Streamed, close_all};
use conduit_message::{TransactionRx, TransactionTx, transaction_channel};
use conduit_metrics::Registry;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub use metrics::BrokerMetrics;

/// Internal budget for each downstream to close
///
/// Effectively unbounded; the caller's `wait_for_close` is the real limit.
pub const DOWNSTREAM_CLOSE_TIMEOUT: Duration = Duration::from_secs(3600);

/// Routing pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    RoundRobin,
    FanOut,
    Greedy,
    Try,
}

impl Pattern {
    /// Pattern name for logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::FanOut => "fan_out",
            Self::Greedy => "greedy",
            Self::Try => "try",
        }
    }
}

/// A `Streamed` component that routes across downstream components
pub struct Broker {
    pattern: Pattern,
    consume_loop: ConsumeLoop,
    outputs: Arc<[Box<dyn Streamed>]>,
}

impl Broker {
    /// Wire `outputs` behind a broker
    ///
    /// Calls `consume` on every output with a channel the broker owns. Must
    /// be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// `NoDownstream` when `outputs` is empty; any error an output returns
    /// from `consume` (outputs already started are closed again).
    pub fn new(
        pattern: Pattern,
        mut outputs: Vec<Box<dyn Streamed>>,
        registry: &dyn Registry,
    ) -> Result<Self, ComponentError> {
        if outputs.is_empty() {
            return Err(ComponentError::NoDownstream);
        }

        let mut senders = Vec::with_capacity(outputs.len());
        for index in 0..outputs.len() {
            let (tx, rx) = transaction_channel();
            if let Err(e) = outputs[index].consume(rx) {
                tracing::warn!(
                    pattern = pattern.as_str(),
                    output = index,
                    error = %e,
                    "failed to start broker output"
                );
                for started in &outputs[..index] {
                    started.close_async();
                }
                return Err(e);
            }
            senders.push(tx);
        }

        let outputs: Arc<[Box<dyn Streamed>]> = outputs.into();
        let metrics = BrokerMetrics::new(registry, pattern);
        let lifecycle = Lifecycle::new();
        let close = lifecycle.close_token();
        let acks = TaskTracker::new();

        tracing::debug!(
            pattern = pattern.as_str(),
            outputs = outputs.len(),
            "broker wired"
        );

        let routing_acks = acks.clone();
        let body =
            move |rx: TransactionRx| route(pattern, rx, senders, close, routing_acks, metrics);
        let consume_loop = ConsumeLoop::spawn(
            pattern.as_str(),
            lifecycle,
            body,
            teardown(pattern, Arc::clone(&outputs), acks),
        );

        Ok(Self {
            pattern,
            consume_loop,
            outputs,
        })
    }

    /// Create a round-robin broker
    pub fn round_robin(
        outputs: Vec<Box<dyn Streamed>>,
        registry: &dyn Registry,
    ) -> Result<Self, ComponentError> {
        Self::new(Pattern::RoundRobin, outputs, registry)
    }

    /// Create a fan-out broker
    pub fn fan_out(
        outputs: Vec<Box<dyn Streamed>>,
        registry: &dyn Registry,
    ) -> Result<Self, ComponentError> {
        Self::new(Pattern::FanOut, outputs, registry)
    }

    /// The broker's routing pattern
    #[inline]
    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Number of downstream components
    #[inline]
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }
}

async fn route(
    pattern: Pattern,
    rx: TransactionRx,
    senders: Vec<TransactionTx>,
    close: CancellationToken,
    acks: TaskTracker,
    metrics: BrokerMetrics,
) {
    tracing::info!(
        pattern = pattern.as_str(),
        outputs = senders.len(),
        "broker started"
    );

    match pattern {
        Pattern::RoundRobin => round_robin::run(rx, senders, close, &metrics).await,
        Pattern::FanOut => fan_out::run(rx, senders, close, &acks, &metrics).await,
        Pattern::Greedy => greedy::run(rx, senders, close, &metrics).await,
        Pattern::Try => try_outputs::run(rx, senders, close, &acks, &metrics).await,
    }

    tracing::info!(
        pattern = pattern.as_str(),
        forwarded = metrics.forwarded.get(),
        errors = metrics.error.get(),
        "broker stopped routing"
    );
}

async fn teardown(pattern: Pattern, outputs: Arc<[Box<dyn Streamed>]>, acks: TaskTracker) {
    match close_all(&outputs[..], DOWNSTREAM_CLOSE_TIMEOUT).await {
        Ok(()) => tracing::debug!(pattern = pattern.as_str(), "broker outputs closed"),
        Err(e) => tracing::warn!(
            pattern = pattern.as_str(),
            error = %e,
            "broker outputs did not close in time"
        ),
    }

    // Closed outputs have acked or dropped everything they were handed
    acks.close();
    if !acks.is_empty() {
        tracing::debug!(
            pattern = pattern.as_str(),
            outstanding = acks.len(),
            "waiting for outstanding acknowledgments"
        );
    }
    acks.wait().await;
}

#[async_trait]
impl Closable for Broker {
    fn close_async(&self) {
        if self.consume_loop.lifecycle().trigger_close() {
            tracing::debug!(pattern = self.pattern.as_str(), "broker closing");
        }
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), ComponentError> {
        self.consume_loop.lifecycle().wait_for_close(timeout).await
    }
}

impl Streamed for Broker {
    fn consume(&mut self, rx: TransactionRx) -> Result<(), ComponentError> {
        self.consume_loop.consume(rx)
    }

    fn connected(&self) -> bool {
        self.outputs.iter().all(|output| output.connected())
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("pattern", &self.pattern)
            .field("outputs", &self.outputs.len())
            .field("state", &self.consume_loop.lifecycle().state())
            .finish()
    }
}
