//! Human-readable metrics formatter
//!
//! Formats metrics in a compact, readable format for operators. One line per
//! metric name, one entry per label set.
//!
//! # Example Output
//!
//! ```text
//! [metrics] broker_forwarded: pattern=round_robin 12.0K (200/s)
//! [metrics] output_sent: endpoint=get 1.2K (20/s) | endpoint=stream 40 (1/s)
//! [metrics] output_latency_ns: endpoint=get (20 obs, 1.20ms avg, 3.40ms max)
//! ```

use std::fmt::Write;

use super::{MetricsFormatter, format_count, format_latency, format_rate};
use crate::{MetricKey, MetricsRates, MetricsSnapshot};

/// Human-readable metrics formatter
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter;

impl HumanFormatter {
    /// Create a new human formatter
    pub fn new() -> Self {
        Self
    }

    fn labels(key: &MetricKey) -> String {
        if key.labels.is_empty() {
            return "total".to_string();
        }
        key.labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn format_counters(&self, rates: &MetricsRates, lines: &mut Vec<String>) {
        let mut current: Option<&str> = None;
        let mut line = String::new();

        for counter in &rates.counters {
            if current != Some(counter.key.name.as_str()) {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                current = Some(counter.key.name.as_str());
                let _ = write!(line, "[metrics] {}:", counter.key.name);
            } else {
                line.push_str(" |");
            }

            let _ = write!(
                line,
                " {} {} ({})",
                Self::labels(&counter.key),
                format_count(counter.total),
                format_rate(counter.per_sec),
            );
        }

        if !line.is_empty() {
            lines.push(line);
        }
    }

    fn format_timers(&self, rates: &MetricsRates, lines: &mut Vec<String>) {
        for timer in &rates.timers {
            if timer.count == 0 {
                continue;
            }
            lines.push(format!(
                "[metrics] {}: {} ({} obs, {} avg, {} max)",
                timer.key.name,
                Self::labels(&timer.key),
                timer.count,
                format_latency(timer.mean_ns),
                format_latency(timer.max_ns),
            ));
        }
    }
}

impl MetricsFormatter for HumanFormatter {
    fn format(&self, snapshot: &MetricsSnapshot, rates: Option<&MetricsRates>) -> String {
        let Some(rates) = rates else {
            return "[metrics] collecting baseline...".to_string();
        };

        if snapshot.is_empty() {
            return "[metrics] no metrics registered".to_string();
        }

        let mut lines = Vec::with_capacity(rates.counters.len() + rates.timers.len());
        self.format_counters(rates, &mut lines);
        self.format_timers(rates, &mut lines);
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CounterRate, CounterSample, TimerRate};

    fn snapshot() -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: None,
            counters: vec![CounterSample {
                key: MetricKey::new("output_sent", &[("endpoint", "get")]),
                value: 1,
            }],
            timers: Vec::new(),
        }
    }

    #[test]
    fn test_baseline() {
        let output = HumanFormatter::new().format(&snapshot(), None);
        assert!(output.contains("collecting baseline"));
    }

    #[test]
    fn test_empty_registry() {
        let output =
            HumanFormatter::new().format(&MetricsSnapshot::default(), Some(&MetricsRates::default()));
        assert!(output.contains("no metrics"));
    }

    #[test]
    fn test_counters_grouped_by_name() {
        let rates = MetricsRates {
            elapsed_secs: 1.0,
            counters: vec![
                CounterRate {
                    key: MetricKey::new("output_sent", &[("endpoint", "get")]),
                    total: 1200,
                    per_sec: 20.0,
                },
                CounterRate {
                    key: MetricKey::new("output_sent", &[("endpoint", "stream")]),
                    total: 40,
                    per_sec: 1.0,
                },
                CounterRate {
                    key: MetricKey::new("broker_forwarded", &[]),
                    total: 5,
                    per_sec: 5.0,
                },
            ],
            timers: Vec::new(),
        };

        let output = HumanFormatter::new().format(&snapshot(), Some(&rates));
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "[metrics] output_sent: endpoint=get 1.2K (20/s) | endpoint=stream 40 (1/s)"
        );
        assert_eq!(lines[1], "[metrics] broker_forwarded: total 5 (5/s)");
    }

    #[test]
    fn test_timers_skip_idle() {
        let rates = MetricsRates {
            elapsed_secs: 1.0,
            counters: Vec::new(),
            timers: vec![
                TimerRate {
                    key: MetricKey::new("output_latency_ns", &[("endpoint", "get")]),
                    count: 20,
                    mean_ns: 1_200_000,
                    max_ns: 3_400_000,
                },
                TimerRate {
                    key: MetricKey::new("output_latency_ns", &[("endpoint", "stream")]),
                    count: 0,
                    mean_ns: 0,
                    max_ns: 0,
                },
            ],
        };

        let output = HumanFormatter::new().format(&snapshot(), Some(&rates));
        assert_eq!(
            output,
            "[metrics] output_latency_ns: endpoint=get (20 obs, 1.20ms avg, 3.40ms max)"
        );
    }
}
