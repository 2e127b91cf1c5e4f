//! Try routing
//!
//! Each transaction goes to output 0. If that output acknowledges with an
//! error the same payload is sent to output 1, and so on. Upstream receives
//! the first success, or the last error once every output has failed. One
//! transaction is in flight at a time.
//!
//! Close stops failover. An attempt already handed to an output keeps its
//! own result: the wait moves to the broker's ack tracker and routing stops.

use conduit_component::{Forwarded, forward, next_transaction, reject_pending};
use conduit_message::{DeliveryError, Transaction, TransactionRx, TransactionTx};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::metrics::BrokerMetrics;

pub(crate) async fn run(
    mut rx: TransactionRx,
    senders: Vec<TransactionTx>,
    close: CancellationToken,
    acks: &TaskTracker,
    metrics: &BrokerMetrics,
) {
    'routing: while let Some(transaction) = next_transaction(&mut rx, &close).await {
        let (payload, ack) = transaction.into_parts();
        let mut result = Err(DeliveryError::DownstreamClosed);

        for (index, tx) in senders.iter().enumerate() {
            let (attempt, mut attempt_ack) = Transaction::pending(payload.clone());

            match forward(tx, attempt, &close).await {
                Forwarded::Sent => metrics.forwarded.inc(),
                Forwarded::ShuttingDown => {
                    result = Err(DeliveryError::ShuttingDown);
                    break;
                }
                Forwarded::DownstreamClosed => {
                    result = Err(DeliveryError::DownstreamClosed);
                    continue;
                }
            }

            let acked = tokio::select! {
                biased;
                acked = &mut attempt_ack => Some(acked),
                _ = close.cancelled() => None,
            };
            let Some(acked) = acked else {
                let metrics = metrics.clone();
                acks.spawn(async move {
                    let result = attempt_ack.await;
                    metrics.record_ack(&result);
                    ack.send(result);
                });
                break 'routing;
            };

            result = acked;
            match &result {
                Ok(()) => break,
                Err(_) if close.is_cancelled() => break,
                Err(e) => tracing::debug!(output = index, error = %e, "try output failed"),
            }
        }

        metrics.record_ack(&result);
        ack.send(result);
    }

    reject_pending(&mut rx);
}
