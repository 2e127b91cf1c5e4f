//! Close-aware channel operations
//!
//! Every blocking step on a transaction stream (waiting for input, for
//! downstream capacity, for an acknowledgment) races the component's close
//! signal. These helpers encode that race once.

use conduit_message::{
    AckReceiver, AckResult, DeliveryError, Transaction, TransactionRx, TransactionTx,
};
use tokio_util::sync::CancellationToken;

/// Outcome of `forward`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarded {
    /// Handed to the downstream channel
    Sent,
    /// Close won the race; acknowledged with `ShuttingDown`
    ShuttingDown,
    /// Downstream receiver is gone; acknowledged with `DownstreamClosed`
    DownstreamClosed,
}

impl Forwarded {
    #[inline]
    pub fn is_sent(self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Wait for the next inbound transaction
///
/// Returns `None` when close is requested or the upstream sender is gone.
pub async fn next_transaction(
    rx: &mut TransactionRx,
    close: &CancellationToken,
) -> Option<Transaction> {
    tokio::select! {
        biased;
        _ = close.cancelled() => None,
        transaction = rx.recv() => transaction,
    }
}

/// Forward a transaction downstream, waiting for capacity
///
/// A slot is reserved before the transaction is moved, so when close wins
/// the transaction is still owned here and gets acknowledged rather than
/// lost.
pub async fn forward(
    tx: &TransactionTx,
    transaction: Transaction,
    close: &CancellationToken,
) -> Forwarded {
    let permit = tokio::select! {
        biased;
        _ = close.cancelled() => {
            transaction.ack(Err(DeliveryError::ShuttingDown));
            return Forwarded::ShuttingDown;
        }
        permit = tx.reserve() => permit,
    };

    match permit {
        Ok(permit) => {
            permit.send(transaction);
            Forwarded::Sent
        }
        Err(_) => {
            transaction.ack(Err(DeliveryError::DownstreamClosed));
            Forwarded::DownstreamClosed
        }
    }
}

/// Wait for an acknowledgment, giving up with `ShuttingDown` on close
pub async fn await_ack(ack: AckReceiver, close: &CancellationToken) -> AckResult {
    tokio::select! {
        result = ack => result,
        _ = close.cancelled() => Err(DeliveryError::ShuttingDown),
    }
}

/// Stop accepting and reject anything already buffered
///
/// Transactions left in the channel are acknowledged with `ShuttingDown`.
/// Returns how many were rejected.
pub fn reject_pending(rx: &mut TransactionRx) -> usize {
    rx.close();
    let mut rejected = 0;
    while let Ok(transaction) = rx.try_recv() {
        transaction.ack(Err(DeliveryError::ShuttingDown));
        rejected += 1;
    }
    rejected
}
