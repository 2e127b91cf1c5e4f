//! `[metrics]` section
//!
//! Drives `conduit_metrics::MetricsReporter`: every `interval` the reporter
//! snapshots the registry (component counters such as `broker_forwarded` or
//! `output_sent`) and logs one report line in the chosen `format`. An
//! omitted section reports in human form once a minute.

use serde::Deserialize;
use std::time::Duration;

/// How a report line is rendered
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFormat {
    /// `name{labels}=value` pairs with per-second rates
    #[default]
    Human,
    /// One JSON object per report, for log shippers
    Json,
}

/// Periodic registry report settings
///
/// ```toml
/// [metrics]
/// interval = "10s"
/// format = "json"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// `false` leaves the registry collecting but never logs it
    pub enabled: bool,

    /// Time between reports; must be non-zero while enabled
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    pub format: MetricsFormat,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(60),
            format: MetricsFormat::Human,
        }
    }
}

impl MetricsConfig {
    /// Report period, `None` when reporting is switched off
    pub fn reporting_interval(&self) -> Option<Duration> {
        self.enabled.then_some(self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_omitted_section_reports_every_minute() {
        let config: MetricsConfig = toml::from_str("").unwrap();
        assert_eq!(config.reporting_interval(), Some(Duration::from_secs(60)));
        assert_eq!(config.format, MetricsFormat::Human);
    }

    #[test]
    fn test_json_reports_at_custom_interval() {
        let config: MetricsConfig = toml::from_str(
            r#"
            interval = "2m 30s"
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.reporting_interval(), Some(Duration::from_secs(150)));
        assert_eq!(config.format, MetricsFormat::Json);
    }

    #[test]
    fn test_disabled_has_no_interval() {
        let config: MetricsConfig =
            toml::from_str("enabled = false\ninterval = \"1s\"").unwrap();
        assert_eq!(config.reporting_interval(), None);
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result: Result<MetricsConfig, _> = toml::from_str("format = \"prometheus\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_interval_must_be_a_duration() {
        let result: Result<MetricsConfig, _> = toml::from_str("interval = 10");
        assert!(result.is_err());
    }
}
