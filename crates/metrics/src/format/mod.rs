//! Metrics output formatters
//!
//! Formats registry snapshots for human-readable or JSON output.

mod human;
mod json;

pub use human::HumanFormatter;
pub use json::JsonFormatter;

use crate::{MetricsRates, MetricsSnapshot};

/// Trait for metrics formatters
pub trait MetricsFormatter: Send + Sync {
    /// Format one report
    ///
    /// `rates` is `None` on the first tick, before a baseline exists.
    fn format(&self, snapshot: &MetricsSnapshot, rates: Option<&MetricsRates>) -> String;
}

/// Format count with K/M suffix for readability
pub fn format_count(count: u64) -> String {
    const K: u64 = 1000;
    const M: u64 = 1_000_000;

    if count >= M {
        format!("{:.1}M", count as f64 / M as f64)
    } else if count >= K {
        format!("{:.1}K", count as f64 / K as f64)
    } else {
        count.to_string()
    }
}

/// Format rate per second with K/M suffix
pub fn format_rate(rate: f64) -> String {
    const K: f64 = 1000.0;
    const M: f64 = 1_000_000.0;

    if rate >= M {
        format!("{:.1}M/s", rate / M)
    } else if rate >= K {
        format!("{:.1}K/s", rate / K)
    } else {
        format!("{:.0}/s", rate)
    }
}

/// Format a nanosecond latency as us, ms or s
pub fn format_latency(ns: u64) -> String {
    const US: u64 = 1_000;
    const MS: u64 = 1_000_000;
    const S: u64 = 1_000_000_000;

    if ns >= S {
        format!("{:.2}s", ns as f64 / S as f64)
    } else if ns >= MS {
        format!("{:.2}ms", ns as f64 / MS as f64)
    } else if ns >= US {
        format!("{:.0}us", ns as f64 / US as f64)
    } else {
        format!("{}ns", ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(500), "500");
        assert_eq!(format_count(1000), "1.0K");
        assert_eq!(format_count(1500), "1.5K");
        assert_eq!(format_count(1_000_000), "1.0M");
        assert_eq!(format_count(1_500_000), "1.5M");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(500.0), "500/s");
        assert_eq!(format_rate(1000.0), "1.0K/s");
        assert_eq!(format_rate(1_200_000.0), "1.2M/s");
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(500), "500ns");
        assert_eq!(format_latency(12_000), "12us");
        assert_eq!(format_latency(1_500_000), "1.50ms");
        assert_eq!(format_latency(2_000_000_000), "2.00s");
    }
}
