//! Conduit - Message
//!
//! The data types that flow through a conduit stream and the acknowledgment
//! handshake that travels back against the flow.
//!
//! # Architecture
//!
//! ```text
//! [Input] --Transaction{Batch, AckSender}--> [Broker] --> [Output]
//!    ^                                                       |
//!    └──────────── AckReceiver <── Ok(()) / DeliveryError ───┘
//! ```
//!
//! # Key Design
//!
//! - **Zero-copy parts**: `Part` data is `bytes::Bytes`, so cloning a `Batch`
//!   for fan-out shares the underlying buffers
//! - **Single-use acknowledgment**: `Transaction::ack` consumes the
//!   transaction, so a second acknowledgment cannot be written
//! - **No silent drops**: a transaction dropped without acknowledgment
//!   resolves its receiver to `DeliveryError::Dropped`
//! - **Backpressure**: transaction channels hold a single slot per hop
//!
//! # Example
//!
//! ```ignore
//! use conduit_message::{Batch, Transaction};
//!
//! let (transaction, ack) = Transaction::pending(Batch::quick(["hello world"]));
//! tx.send(transaction).await?;
//!
//! // Resolves once the downstream acknowledges
//! ack.wait().await?;
//! ```

mod batch;
mod error;
mod transaction;

pub use batch::{BATCH_SIZE_KEY, Batch, Part};
pub use error::{AckResult, DeliveryError};
pub use transaction::{
    AckReceiver, AckSender, Transaction, TransactionRx, TransactionTx, ack_channel,
    transaction_channel,
};

/// Capacity of a transaction channel between two components
///
/// One slot is the smallest bounded channel tokio offers. A producer can hand
/// off one transaction, after which it blocks until the consumer reads it.
pub const TRANSACTION_CHANNEL_SIZE: usize = 1;
