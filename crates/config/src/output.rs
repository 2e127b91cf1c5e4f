//! Output configuration
//!
//! The output section is a tree: a broker holds a list of outputs, any of
//! which may itself be a broker.
//!
//! # Example
//!
//! ```toml
//! [output]
//! type = "broker"
//! pattern = "round_robin"
//!
//! [[output.outputs]]
//! type = "stdout"
//!
//! [[output.outputs]]
//! type = "http_server"
//! address = "0.0.0.0:4196"
//! timeout = "5s"
//! ```

use serde::Deserialize;
use std::time::Duration;

/// One output node, tagged by `type`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputConfig {
    /// Route across child outputs
    Broker(BrokerOutputConfig),
    /// Serve batches to HTTP clients
    HttpServer(HttpServerOutputConfig),
    /// Write each part to stdout
    Stdout(StdoutOutputConfig),
    /// Discard everything
    Drop,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::Stdout(StdoutOutputConfig::default())
    }
}

impl OutputConfig {
    /// Output type name for logs
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Broker(_) => "broker",
            Self::HttpServer(_) => "http_server",
            Self::Stdout(_) => "stdout",
            Self::Drop => "drop",
        }
    }
}

/// Broker routing pattern
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BrokerPattern {
    /// Each batch to the next output in turn
    #[default]
    RoundRobin,
    /// Each batch to every output
    FanOut,
    /// Each batch to whichever output is ready first
    Greedy,
    /// Each batch to the first output, failing over in order
    Try,
}

impl BrokerPattern {
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

/// Broker output configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BrokerOutputConfig {
    pub pattern: BrokerPattern,
    pub outputs: Vec<OutputConfig>,
}

/// HTTP server output configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpServerOutputConfig {
    /// Listen address; when unset the output is served by an embedding server
    pub address: Option<String>,

    /// Single-shot endpoint
    pub path: String,

    /// Continuous stream endpoint
    pub stream_path: String,

    /// Websocket endpoint
    pub ws_path: String,

    /// Verbs accepted on the single-shot endpoint
    pub allowed_verbs: Vec<String>,

    /// How long a single-shot request waits for a batch
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for HttpServerOutputConfig {
    fn default() -> Self {
        Self {
            address: None,
            path: "/get".to_string(),
            stream_path: "/get/stream".to_string(),
            ws_path: "/get/ws".to_string(),
            allowed_verbs: vec!["GET".to_string()],
            timeout: Duration::from_secs(5),
        }
    }
}

/// Stdout output configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StdoutOutputConfig {
    /// Written after each part, newline when unset
    pub delimiter: Option<String>,
}
