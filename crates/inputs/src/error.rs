//! Reader error types

use thiserror::Error;

/// Why a read produced no batch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// Connection lost; the input reconnects before reading again
    #[error("not connected")]
    NotConnected,

    /// Nothing arrived in time; the input reads again
    #[error("read timed out")]
    Timeout,

    /// Source is exhausted; the input shuts down
    #[error("end of input")]
    EndOfInput,

    /// Any other failure; the input backs off and reads again
    #[error("read failed: {0}")]
    Other(String),
}

impl ReadError {
    /// Create an Other error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
