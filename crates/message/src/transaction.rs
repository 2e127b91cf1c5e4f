//! Transaction - a batch paired with its acknowledgment channel
//!
//! The party that reads a `Transaction` from its inbound channel owns the
//! acknowledgment. It either acknowledges directly or forwards the whole
//! transaction to exactly one downstream, which then owns it.
//!
//! The acknowledgment channel is a `tokio::sync::oneshot`: one slot, one send.
//! `Transaction::ack` consumes the transaction, so acknowledging twice does
//! not compile. Dropping an unacknowledged transaction resolves the receiver
//! to `DeliveryError::Dropped`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};

use crate::TRANSACTION_CHANNEL_SIZE;
use crate::batch::Batch;
use crate::error::{AckResult, DeliveryError};

/// Sending half of a transaction channel
pub type TransactionTx = mpsc::Sender<Transaction>;

/// Receiving half of a transaction channel
pub type TransactionRx = mpsc::Receiver<Transaction>;

/// Create a transaction channel between two components
#[inline]
pub fn transaction_channel() -> (TransactionTx, TransactionRx) {
    mpsc::channel(TRANSACTION_CHANNEL_SIZE)
}

/// Create a single-use acknowledgment channel
#[inline]
pub fn ack_channel() -> (AckSender, AckReceiver) {
    let (tx, rx) = oneshot::channel();
    (AckSender(tx), AckReceiver(rx))
}

/// Write half of an acknowledgment channel
#[derive(Debug)]
pub struct AckSender(oneshot::Sender<AckResult>);

impl AckSender {
    /// Send the acknowledgment
    ///
    /// Never blocks. Returns `false` if the producer stopped waiting.
    #[inline]
    pub fn send(self, result: AckResult) -> bool {
        self.0.send(result).is_ok()
    }

    /// Check if the producer stopped waiting for this acknowledgment
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    /// Wait until the producer stops waiting for this acknowledgment
    pub async fn closed(&mut self) {
        self.0.closed().await
    }
}

/// Read half of an acknowledgment channel
///
/// Also a `Future` resolving to the acknowledgment.
#[derive(Debug)]
pub struct AckReceiver(oneshot::Receiver<AckResult>);

impl AckReceiver {
    /// Wait for the acknowledgment
    ///
    /// Resolves to `DeliveryError::Dropped` if the sender was dropped
    /// without acknowledging.
    pub async fn wait(self) -> AckResult {
        self.await
    }

    /// Take the acknowledgment if it has already arrived
    pub fn try_recv(&mut self) -> Option<AckResult> {
        match self.0.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(DeliveryError::Dropped)),
        }
    }
}

impl Future for AckReceiver {
    type Output = AckResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0)
            .poll(cx)
            .map(|r| r.unwrap_or(Err(DeliveryError::Dropped)))
    }
}

/// A message batch and the channel its delivery outcome is reported on
#[derive(Debug)]
pub struct Transaction {
    payload: Batch,
    ack: AckSender,
}

impl Transaction {
    /// Wrap a batch and a caller-owned acknowledgment sender
    #[inline]
    pub fn new(payload: Batch, ack: AckSender) -> Self {
        Self { payload, ack }
    }

    /// Create a transaction along with the receiver for its acknowledgment
    pub fn pending(payload: Batch) -> (Self, AckReceiver) {
        let (ack, rx) = ack_channel();
        (Self::new(payload, ack), rx)
    }

    /// The batch being delivered
    #[inline]
    pub fn payload(&self) -> &Batch {
        &self.payload
    }

    /// Mutable access to the batch
    #[inline]
    pub fn payload_mut(&mut self) -> &mut Batch {
        &mut self.payload
    }

    /// Acknowledge the transaction, consuming it
    ///
    /// Returns `false` if the producer stopped waiting.
    pub fn ack(self, result: AckResult) -> bool {
        let delivered = self.ack.send(result);
        if !delivered {
            tracing::trace!("acknowledgment receiver gone");
        }
        delivered
    }

    /// Split into the batch and the acknowledgment sender
    ///
    /// The caller takes over the obligation to acknowledge.
    #[inline]
    pub fn into_parts(self) -> (Batch, AckSender) {
        (self.payload, self.ack)
    }
}

#[cfg(test)]
#[path = "transaction_test.rs"]
mod transaction_test;
