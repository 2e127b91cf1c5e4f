//! Configuration validation
//!
//! Validates config consistency:
//! - Every broker has at least one output
//! - HTTP server outputs allow at least one verb and use distinct paths
//! - Split processors have a positive size
//! - Generate input has something to emit
//! - Rate limits and intervals are non-zero
//! - Enabled metrics reporting has a non-zero interval

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::input::{InputConfig, RateLimitConfig};
use crate::metrics::MetricsConfig;
use crate::output::{HttpServerOutputConfig, OutputConfig};
use crate::pipeline::ProcessorConfig;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_input(&config.input)?;
    validate_processors(&config.pipeline.processors)?;
    validate_output(&config.output, "output")?;
    validate_metrics(&config.metrics)?;
    Ok(())
}

fn validate_metrics(metrics: &MetricsConfig) -> Result<()> {
    match metrics.reporting_interval() {
        Some(interval) if interval.is_zero() => Err(ConfigError::invalid_value(
            "metrics",
            "reporter",
            "interval",
            "must be greater than zero while reporting is enabled",
        )),
        _ => Ok(()),
    }
}

fn validate_input(input: &InputConfig) -> Result<()> {
    match input {
        InputConfig::Generate(generate) => {
            if generate.messages.is_empty() {
                return Err(ConfigError::invalid_value(
                    "input",
                    "generate",
                    "messages",
                    "at least one message is required",
                ));
            }
        }
    }

    if let Some(rate_limit) = input.rate_limit() {
        validate_rate_limit(rate_limit)?;
    }

    Ok(())
}

fn validate_rate_limit(rate_limit: &RateLimitConfig) -> Result<()> {
    if rate_limit.count == 0 {
        return Err(ConfigError::invalid_value(
            "input",
            "rate_limit",
            "count",
            "must be greater than zero",
        ));
    }
    if rate_limit.interval.is_zero() {
        return Err(ConfigError::invalid_value(
            "input",
            "rate_limit",
            "interval",
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_processors(processors: &[ProcessorConfig]) -> Result<()> {
    for (i, processor) in processors.iter().enumerate() {
        if let ProcessorConfig::Split { size: 0 } = processor {
            return Err(ConfigError::invalid_value(
                "processor",
                format!("pipeline.processors[{i}]"),
                "size",
                "must be at least 1",
            ));
        }
    }
    Ok(())
}

/// Walk the output tree, `path` names the node in error messages
fn validate_output(output: &OutputConfig, path: &str) -> Result<()> {
    match output {
        OutputConfig::Broker(broker) => {
            if broker.outputs.is_empty() {
                return Err(ConfigError::empty_broker(path));
            }
            for (i, child) in broker.outputs.iter().enumerate() {
                validate_output(child, &format!("{path}.outputs[{i}]"))?;
            }
            Ok(())
        }
        OutputConfig::HttpServer(http) => validate_http_server(http, path),
        OutputConfig::Stdout(_) | OutputConfig::Drop => Ok(()),
    }
}

fn validate_http_server(http: &HttpServerOutputConfig, path: &str) -> Result<()> {
    if http.allowed_verbs.is_empty() {
        return Err(ConfigError::invalid_value(
            "output",
            path,
            "allowed_verbs",
            "at least one verb is required",
        ));
    }

    if http.timeout.is_zero() {
        return Err(ConfigError::invalid_value(
            "output",
            path,
            "timeout",
            "must be greater than zero",
        ));
    }

    let paths = [
        ("path", &http.path),
        ("stream_path", &http.stream_path),
        ("ws_path", &http.ws_path),
    ];
    for (field, value) in paths {
        if !value.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "output",
                path,
                field,
                format!("'{value}' must start with '/'"),
            ));
        }
    }
    if http.path == http.stream_path || http.path == http.ws_path || http.stream_path == http.ws_path
    {
        return Err(ConfigError::invalid_value(
            "output",
            path,
            "path",
            "path, stream_path and ws_path must differ",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_broker_rejected() {
        let err = Config::from_str(
            r#"
[output]
type = "broker"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyBroker { ref path } if path == "output"));
    }

    #[test]
    fn test_nested_empty_broker_names_path() {
        let err = Config::from_str(
            r#"
[output]
type = "broker"

[[output.outputs]]
type = "drop"

[[output.outputs]]
type = "broker"
pattern = "greedy"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("output.outputs[1]"));
    }

    #[test]
    fn test_http_server_needs_verbs() {
        let err = Config::from_str(
            r#"
[output]
type = "http_server"
allowed_verbs = []
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("allowed_verbs"));
    }

    #[test]
    fn test_http_server_distinct_paths() {
        let err = Config::from_str(
            r#"
[output]
type = "http_server"
path = "/get"
stream_path = "/get"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_http_server_path_needs_slash() {
        let err = Config::from_str(
            r#"
[output]
type = "http_server"
ws_path = "ws"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("ws_path"));
    }

    #[test]
    fn test_split_size_zero_rejected() {
        let err = Config::from_str(
            r#"
[[pipeline.processors]]
type = "split"
size = 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("pipeline.processors[0]"));
    }

    #[test]
    fn test_generate_needs_messages() {
        let err = Config::from_str(
            r#"
[input]
type = "generate"
messages = []
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("messages"));
    }

    #[test]
    fn test_rate_limit_zero_count_rejected() {
        let err = Config::from_str(
            r#"
[input]
type = "generate"

[input.rate_limit]
count = 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("count"));
    }

    #[test]
    fn test_metrics_zero_interval_rejected() {
        let err = Config::from_str(
            r#"
[metrics]
interval = "0s"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("interval"));
    }

    #[test]
    fn test_metrics_zero_interval_allowed_when_disabled() {
        let config = Config::from_str(
            r#"
[metrics]
enabled = false
interval = "0s"
"#,
        )
        .unwrap();
        assert_eq!(config.metrics.reporting_interval(), None);
    }
}
