//! Periodic metrics reporter
//!
//! Reads a registry snapshot at the configured interval, computes rates
//! against the previous snapshot and logs the formatted report via tracing.
//! Runs as an async task until cancelled.

use std::sync::Arc;

use conduit_config::{MetricsConfig, MetricsFormat};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::format::MetricsFormatter;
use crate::{HumanFormatter, JsonFormatter, MetricsSnapshot, Registry};

/// Periodic metrics reporter
pub struct MetricsReporter {
    config: MetricsConfig,
    registry: Arc<dyn Registry>,
    formatter: Box<dyn MetricsFormatter>,
    previous: Option<MetricsSnapshot>,
}

impl MetricsReporter {
    /// Create a reporter for `registry`
    pub fn new(registry: Arc<dyn Registry>, config: &MetricsConfig) -> Self {
        let formatter: Box<dyn MetricsFormatter> = match config.format {
            MetricsFormat::Human => Box::new(HumanFormatter::new()),
            MetricsFormat::Json => Box::new(JsonFormatter::new()),
        };

        Self {
            config: config.clone(),
            registry,
            formatter,
            previous: None,
        }
    }

    /// Run the reporter until cancellation
    ///
    /// Returns immediately when reporting is disabled.
    pub async fn run(mut self, cancel: CancellationToken) {
        let Some(period) = self.config.reporting_interval() else {
            info!("metrics reporting disabled");
            return;
        };
        if period.is_zero() {
            tracing::warn!("metrics interval is zero, reporting disabled");
            return;
        }

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = period.as_secs(),
            format = ?self.config.format,
            "metrics reporter started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.report();
                }
            }
        }
    }

    /// Snapshot and log once, returning the formatted report
    fn report(&mut self) -> String {
        let snapshot = self.registry.snapshot();
        let rates = self
            .previous
            .as_ref()
            .and_then(|prev| snapshot.rates(prev));

        let output = self.formatter.format(&snapshot, rates.as_ref());
        for line in output.lines() {
            info!("{}", line);
        }

        self.previous = Some(snapshot);
        output
    }
}
