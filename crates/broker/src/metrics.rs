//! Broker metrics
//!
//! Handles are looked up once per broker, labelled with the pattern.

use std::sync::Arc;

use conduit_message::AckResult;
use conduit_metrics::{Counter, Registry};

use crate::Pattern;

/// Per-broker counters
#[derive(Debug, Clone)]
pub struct BrokerMetrics {
    /// Transactions handed to a downstream channel
    pub forwarded: Arc<Counter>,
    /// Upstream acknowledgments sent with `Ok`
    pub acked: Arc<Counter>,
    /// Forwarding failures and upstream acknowledgments sent with an error
    pub error: Arc<Counter>,
}

impl BrokerMetrics {
    pub fn new(registry: &dyn Registry, pattern: Pattern) -> Self {
        let labels = [("pattern", pattern.as_str())];
        Self {
            forwarded: registry.counter("broker_forwarded", &labels),
            acked: registry.counter("broker_acked", &labels),
            error: registry.counter("broker_error", &labels),
        }
    }

    /// Count an acknowledgment the broker sends upstream itself
    #[inline]
    pub fn record_ack(&self, result: &AckResult) {
        if result.is_ok() {
            self.acked.inc();
        } else {
            self.error.inc();
        }
    }
}
