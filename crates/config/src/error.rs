//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Broker declared without any outputs
    #[error("broker '{path}' has no outputs - at least one output is required")]
    EmptyBroker {
        /// Position of the broker in the output tree, e.g. `output.outputs[1]`
        path: String,
    },

    /// Validation error - invalid value
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        component: &'static str,
        name: String,
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    /// Create an EmptyBroker error
    pub fn empty_broker(path: impl Into<String>) -> Self {
        Self::EmptyBroker { path: path.into() }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_broker_error() {
        let err = ConfigError::empty_broker("output.outputs[1]");
        assert!(err.to_string().contains("output.outputs[1]"));
        assert!(err.to_string().contains("no outputs"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value(
            "output",
            "output",
            "allowed_verbs",
            "at least one verb is required",
        );
        assert!(err.to_string().contains("allowed_verbs"));
        assert!(err.to_string().contains("at least one verb"));
    }

    #[test]
    fn test_io_error() {
        let err = ConfigError::IoError {
            path: "/missing.toml".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("/missing.toml"));
    }
}
