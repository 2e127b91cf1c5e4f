//! JSON metrics formatter
//!
//! Formats metrics as structured JSON for machine parsing.
//!
//! # Example Output
//!
//! ```json
//! {
//!   "type": "rates",
//!   "elapsed_secs": 60.0,
//!   "counters": [{"name": "output_sent", "labels": {"endpoint": "get"}, "total": 1200, "per_sec": 20.0}],
//!   "timers": [...]
//! }
//! ```

use serde::Serialize;

use super::MetricsFormatter;
use crate::{CounterSample, MetricsRates, MetricsSnapshot, TimerSample};

/// JSON metrics formatter
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ReportJson<'a> {
    Baseline {
        counters: &'a [CounterSample],
        timers: &'a [TimerSample],
    },
    Rates(&'a MetricsRates),
}

impl MetricsFormatter for JsonFormatter {
    fn format(&self, snapshot: &MetricsSnapshot, rates: Option<&MetricsRates>) -> String {
        let report = match rates {
            Some(rates) => ReportJson::Rates(rates),
            None => ReportJson::Baseline {
                counters: &snapshot.counters,
                timers: &snapshot.timers,
            },
        };

        serde_json::to_string(&report).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}
