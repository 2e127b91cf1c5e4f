//! Greedy routing
//!
//! Each transaction goes to whichever output frees a slot first. Outputs
//! whose receiver is gone are skipped. The acknowledgment passes through
//! untouched.

use conduit_component::{next_transaction, reject_pending};
use conduit_message::{DeliveryError, TransactionRx, TransactionTx};
use futures_util::future::{FutureExt, select_all};
use tokio_util::sync::CancellationToken;

use crate::metrics::BrokerMetrics;

pub(crate) async fn run(
    mut rx: TransactionRx,
    senders: Vec<TransactionTx>,
    close: CancellationToken,
    metrics: &BrokerMetrics,
) {
    while let Some(transaction) = next_transaction(&mut rx, &close).await {
        let ready = senders
            .iter()
            .enumerate()
            .filter(|(_, tx)| !tx.is_closed())
            .map(|(index, tx)| tx.reserve().map(move |permit| (index, permit)).boxed())
            .collect::<Vec<_>>();

        if ready.is_empty() {
            metrics.error.inc();
            transaction.ack(Err(DeliveryError::DownstreamClosed));
            tracing::warn!("no greedy output is accepting");
            continue;
        }

        tokio::select! {
            biased;
            _ = close.cancelled() => {
                metrics.error.inc();
                transaction.ack(Err(DeliveryError::ShuttingDown));
                break;
            }
            ((index, permit), _, _) = select_all(ready) => match permit {
                Ok(permit) => {
                    tracing::trace!(output = index, "greedy forward");
                    permit.send(transaction);
                    metrics.forwarded.inc();
                }
                Err(_) => {
                    metrics.error.inc();
                    transaction.ack(Err(DeliveryError::DownstreamClosed));
                }
            },
        }
    }

    reject_pending(&mut rx);
}
