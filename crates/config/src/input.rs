//! Input configuration
//!
//! # Example
//!
//! ```toml
//! [input]
//! type = "generate"
//! messages = ["hello world"]
//! count = 0
//! interval = "1s"
//!
//! [input.rate_limit]
//! count = 100
//! interval = "1s"
//! ```

use serde::Deserialize;
use std::time::Duration;

/// Input selection, tagged by `type`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputConfig {
    /// Emit a fixed list of messages on an interval
    Generate(GenerateInputConfig),
}

impl Default for InputConfig {
    fn default() -> Self {
        Self::Generate(GenerateInputConfig::default())
    }
}

impl InputConfig {
    /// Input type name for logs
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Generate(_) => "generate",
        }
    }

    /// Optional rate limit applied before each read
    pub fn rate_limit(&self) -> Option<&RateLimitConfig> {
        match self {
            Self::Generate(generate) => generate.rate_limit.as_ref(),
        }
    }
}

/// Generate input configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenerateInputConfig {
    /// Messages emitted together as one batch, one part each
    pub messages: Vec<String>,

    /// Number of batches to emit, 0 means unbounded
    pub count: u64,

    /// Delay between batches
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Rate limit applied before each batch
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for GenerateInputConfig {
    fn default() -> Self {
        Self {
            messages: vec!["hello world".to_string()],
            count: 0,
            interval: Duration::from_secs(1),
            rate_limit: None,
        }
    }
}

/// Token-refill rate limit: `count` accesses per `interval`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RateLimitConfig {
    pub count: u32,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            count: 1000,
            interval: Duration::from_secs(1),
        }
    }
}
