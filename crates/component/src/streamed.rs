//! Component traits
//!
//! `Streamed` is the contract every transaction consumer implements (outputs,
//! brokers, processor pipelines). `Input` is the producing side. Both share
//! the two-phase close of `Closable`.

use std::time::Duration;

use async_trait::async_trait;
use conduit_message::TransactionRx;
use futures_util::future::join_all;

use crate::error::ComponentError;

/// Two-phase close: signal, then join
#[async_trait]
pub trait Closable: Send + Sync {
    /// Request shutdown
    ///
    /// Never blocks. Safe to call any number of times; only the first call
    /// begins teardown.
    fn close_async(&self);

    /// Wait for teardown to finish
    ///
    /// # Errors
    ///
    /// `ComponentError::Timeout` if teardown is still running after
    /// `timeout`. Teardown continues in the background.
    async fn wait_for_close(&self, timeout: Duration) -> Result<(), ComponentError>;

    /// `close_async` followed by `wait_for_close`
    async fn close(&self, timeout: Duration) -> Result<(), ComponentError> {
        self.close_async();
        self.wait_for_close(timeout).await
    }
}

/// A component that consumes a transaction stream
///
/// The component owns the receiver it is handed but never the sender: the
/// upstream producer closes the stream by dropping its sender.
pub trait Streamed: Closable {
    /// Start consuming `rx`
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` on a second call, `Closed` after close.
    fn consume(&mut self, rx: TransactionRx) -> Result<(), ComponentError>;

    /// Best-effort hint that the component can reach its target
    fn connected(&self) -> bool;
}

/// A component that produces a transaction stream
pub trait Input: Closable {
    /// Take the receiving end of the produced stream
    ///
    /// Returns `None` once taken.
    fn transactions(&mut self) -> Option<TransactionRx>;

    /// Best-effort hint that the component can reach its source
    fn connected(&self) -> bool;
}

/// Close a set of components concurrently
///
/// Every component is signalled before any is waited on, then all waits run
/// concurrently with the same `timeout`. Returns the first error.
pub async fn close_all<C>(components: &[C], timeout: Duration) -> Result<(), ComponentError>
where
    C: std::ops::Deref + Sync,
    C::Target: Closable,
{
    for component in components {
        component.close_async();
    }

    join_all(
        components
            .iter()
            .map(|component| component.wait_for_close(timeout)),
    )
    .await
    .into_iter()
    .find(|result| result.is_err())
    .unwrap_or(Ok(()))
}
