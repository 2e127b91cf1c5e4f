//! Component error types
//!
//! Lifecycle and construction errors. These are returned from constructors,
//! `consume` and `wait_for_close`; delivery failures travel on
//! acknowledgments as `DeliveryError` instead.

use thiserror::Error;

/// Component lifecycle errors
#[derive(Debug, Error)]
pub enum ComponentError {
    /// `consume` was called on a component that is already running
    #[error("component already started")]
    AlreadyStarted,

    /// The component was closed before or while the call was made
    #[error("component is closed")]
    Closed,

    /// `wait_for_close` gave up before teardown finished
    #[error("timed out waiting for component to close")]
    Timeout,

    /// A broker was built without downstream components
    #[error("at least one downstream component is required")]
    NoDownstream,

    /// Configuration rejected at construction
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Listener could not be bound
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

impl ComponentError {
    /// Create an InvalidConfig error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Check if this is a close timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}
