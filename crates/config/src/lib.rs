//! Conduit Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use conduit_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[output]\ntype = \"drop\"").unwrap();
//! assert_eq!(config.output.type_name(), "drop");
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [input]
//! type = "generate"
//! messages = ["hello world"]
//! interval = "1s"
//!
//! [[pipeline.processors]]
//! type = "split"
//!
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
//! ```

mod error;
mod input;
mod logging;
mod metrics;
mod output;
mod pipeline;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use input::{GenerateInputConfig, InputConfig, RateLimitConfig};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use metrics::{MetricsConfig, MetricsFormat};
pub use output::{
    BrokerOutputConfig, BrokerPattern, HttpServerOutputConfig, OutputConfig, StdoutOutputConfig,
};
pub use pipeline::{PipelineConfig, ProcessorConfig};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Metrics reporting configuration
    pub metrics: MetricsConfig,

    /// Where batches come from
    pub input: InputConfig,

    /// Processors applied between input and output
    pub pipeline: PipelineConfig,

    /// Where batches go
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
