//! Delivery error types
//!
//! The error half of an acknowledgment. These values travel upstream on a
//! transaction's acknowledgment channel and are never raised as panics.

use thiserror::Error;

/// Why a batch was not delivered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Output failed to write the batch
    #[error("write failed: {0}")]
    Write(String),

    /// Destination refused the batch
    #[error("rejected: {0}")]
    Rejected(String),

    /// A processor failed on the batch
    #[error("processing failed: {0}")]
    Processing(String),

    /// The transaction was dropped without being acknowledged
    #[error("transaction dropped without acknowledgment")]
    Dropped,

    /// Component closed before the batch could be forwarded
    #[error("component is shutting down")]
    ShuttingDown,

    /// Downstream stopped accepting transactions
    #[error("downstream closed")]
    DownstreamClosed,

    /// Some of several recipients failed
    #[error("{failed} of {total} recipients failed, first error: {first}")]
    Partial {
        failed: usize,
        total: usize,
        first: Box<DeliveryError>,
    },
}

impl DeliveryError {
    /// Create a write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Create a rejected error
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Create a processing error
    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing(msg.into())
    }
}

impl From<std::io::Error> for DeliveryError {
    fn from(err: std::io::Error) -> Self {
        Self::Write(err.to_string())
    }
}

/// Outcome carried by an acknowledgment
pub type AckResult = Result<(), DeliveryError>;
