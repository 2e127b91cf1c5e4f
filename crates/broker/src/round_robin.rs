//! Round-robin routing
//!
//! Transaction `i` goes to output `i mod N`, regardless of how fast each
//! output is. The counter advances once per accepted transaction, so a
//! failed forward does not shift later assignments. Acknowledgments are
//! not intercepted: the output acks the upstream sender directly.

use conduit_component::{Forwarded, forward, next_transaction, reject_pending};
use conduit_message::{TransactionRx, TransactionTx};
use tokio_util::sync::CancellationToken;

use crate::metrics::BrokerMetrics;

pub(crate) async fn run(
    mut rx: TransactionRx,
    senders: Vec<TransactionTx>,
    close: CancellationToken,
    metrics: &BrokerMetrics,
) {
    let outputs = senders.len();
    let mut counter: usize = 0;

    while let Some(transaction) = next_transaction(&mut rx, &close).await {
        let index = counter % outputs;
        counter = counter.wrapping_add(1);

        match forward(&senders[index], transaction, &close).await {
            Forwarded::Sent => metrics.forwarded.inc(),
            Forwarded::ShuttingDown => {
                metrics.error.inc();
                break;
            }
            Forwarded::DownstreamClosed => {
                metrics.error.inc();
                tracing::warn!(output = index, "round robin output stopped accepting");
            }
        }
    }

    let rejected = reject_pending(&mut rx);
    if rejected > 0 {
        tracing::debug!(rejected, "rejected buffered transactions on close");
    }
}
