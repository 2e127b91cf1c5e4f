//! HTTP server output metrics
//!
//! One set of handles per endpoint, labelled `endpoint=get|stream|websocket`.

use std::sync::Arc;
use std::time::Instant;

use conduit_message::Batch;
use conduit_metrics::{Counter, Registry, Timer};

/// Handles for a single endpoint
#[derive(Debug, Clone)]
pub struct EndpointMetrics {
    /// Messages delivered (collapsed count)
    pub sent: Arc<Counter>,
    /// Transactions delivered
    pub batch_sent: Arc<Counter>,
    /// Failed deliveries
    pub error: Arc<Counter>,
    /// Time from receiving a transaction to acknowledging it
    pub latency: Arc<Timer>,
}

impl EndpointMetrics {
    fn new(registry: &dyn Registry, endpoint: &str) -> Self {
        let labels = [("endpoint", endpoint)];
        Self {
            sent: registry.counter("output_sent", &labels),
            batch_sent: registry.counter("output_batch_sent", &labels),
            error: registry.counter("output_error", &labels),
            latency: registry.timer("output_latency_ns", &labels),
        }
    }

    /// Record a delivered batch
    #[inline]
    pub fn delivered(&self, batch: &Batch, started: Instant) {
        self.sent.add(batch.collapsed_count() as u64);
        self.batch_sent.inc();
        self.latency.record_since(started);
    }
}

/// Metrics for every endpoint of the output
#[derive(Debug, Clone)]
pub struct HttpServerMetrics {
    pub get: EndpointMetrics,
    pub stream: EndpointMetrics,
    pub websocket: EndpointMetrics,
}

impl HttpServerMetrics {
    pub fn new(registry: &dyn Registry) -> Self {
        Self {
            get: EndpointMetrics::new(registry, "get"),
            stream: EndpointMetrics::new(registry, "stream"),
            websocket: EndpointMetrics::new(registry, "websocket"),
        }
    }
}
