//! Fan-out routing
//!
//! Every transaction is copied to every output (part data is shared, not
//! duplicated). Each copy carries its own acknowledgment; a tracked task
//! joins them and acknowledges upstream once:
//!
//! - all `Ok` -> `Ok`
//! - exactly one failure -> that error
//! - several failures -> `DeliveryError::Partial`
//!
//! Several transactions may be awaiting aggregation at once. When the
//! upstream ends, routing waits for all of them before returning. On close
//! it returns at once and the broker teardown waits instead, after the
//! outputs have closed.

use conduit_component::{forward, next_transaction, reject_pending};
use conduit_message::{AckResult, DeliveryError, Transaction, TransactionRx, TransactionTx};
use futures_util::future::join_all;
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
    while let Some(transaction) = next_transaction(&mut rx, &close).await {
        let (payload, ack) = transaction.into_parts();
        let mut pending = Vec::with_capacity(senders.len());

        for tx in &senders {
            let (copy, copy_ack) = Transaction::pending(payload.clone());
            // A failed forward acks the copy, so its receiver still resolves
            if forward(tx, copy, &close).await.is_sent() {
                metrics.forwarded.inc();
            }
            pending.push(copy_ack);
        }

        let metrics = metrics.clone();
        acks.spawn(async move {
            let result = aggregate(join_all(pending).await);
            metrics.record_ack(&result);
            ack.send(result);
        });
    }

    reject_pending(&mut rx);
    drop(senders);

    acks.close();
    tokio::select! {
        _ = acks.wait() => {}
        _ = close.cancelled() => {}
    }
}

/// Fold per-output acknowledgments into one
pub(crate) fn aggregate(results: Vec<AckResult>) -> AckResult {
    let total = results.len();
    let mut failures = results.into_iter().filter_map(Result::err);

    let Some(first) = failures.next() else {
        return Ok(());
    };
    let failed = 1 + failures.count();

    if failed == 1 {
        Err(first)
    } else {
        Err(DeliveryError::Partial {
            failed,
            total,
            first: Box::new(first),
        })
    }
}
