//! Processor error types

use thiserror::Error;

/// Errors raised while processing a batch
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Processing logic failed
    #[error("processor {processor} failed: {message}")]
    Failed {
        processor: &'static str,
        message: String,
    },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ProcessError {
    /// Create a failed error
    pub fn failed(processor: &'static str, message: impl Into<String>) -> Self {
        Self::Failed {
            processor,
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
