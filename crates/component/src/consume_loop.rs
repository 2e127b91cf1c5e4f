//! ConsumeLoop - single coordinating task per component
//!
//! The task is spawned when the component is built, not when `consume` is
//! called. It waits for either the inbound receiver or the close signal:
//!
//! ```text
//! spawn ──┬── consume(rx) ──> body(rx) ──┐
//!         └── close ─────────> drop(body)┴──> teardown ──> mark_closed
//! ```
//!
//! Dropping the body drops whatever it captured (typically the senders of
//! downstream channels), so downstreams observe end of stream before
//! teardown asks them to close. A component closed before it ever started
//! therefore still tears down its downstreams and reaches `Closed`.

use std::future::Future;

use conduit_message::TransactionRx;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::ComponentError;
use crate::lifecycle::Lifecycle;

/// Handle to a component's coordinating task
#[derive(Debug)]
pub struct ConsumeLoop {
    lifecycle: Lifecycle,
    inbound: Mutex<Option<oneshot::Sender<TransactionRx>>>,
}

impl ConsumeLoop {
    /// Spawn the coordinating task
    ///
    /// `body` runs once with the inbound receiver and should return when the
    /// stream ends or close is signalled. `teardown` runs after the body (or
    /// instead of it, if close came first). The lifecycle is marked closed
    /// when the task exits.
    pub fn spawn<B, BFut, T>(component: &'static str, lifecycle: Lifecycle, body: B, teardown: T) -> Self
    where
        B: FnOnce(TransactionRx) -> BFut + Send + 'static,
        BFut: Future<Output = ()> + Send + 'static,
        T: Future<Output = ()> + Send + 'static,
    {
        let (inbound_tx, inbound_rx) = oneshot::channel();
        let task_lifecycle = lifecycle.clone();

        tokio::spawn(async move {
            let _closed = task_lifecycle.closed_guard();

            let inbound = tokio::select! {
                biased;
                _ = task_lifecycle.closing() => None,
                rx = inbound_rx => rx.ok(),
            };

            match inbound {
                Some(rx) => {
                    tracing::debug!(component, "consume loop started");
                    body(rx).await;
                }
                None => {
                    tracing::debug!(component, "closed before consuming");
                    drop(body);
                }
            }

            teardown.await;
            tracing::debug!(component, "consume loop finished");
        });

        Self {
            lifecycle,
            inbound: Mutex::new(Some(inbound_tx)),
        }
    }

    /// Hand the inbound receiver to the task
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` on a second call, `Closed` after close.
    pub fn consume(&self, rx: TransactionRx) -> Result<(), ComponentError> {
        self.lifecycle.start()?;
        let inbound = self
            .inbound
            .lock()
            .take()
            .ok_or(ComponentError::AlreadyStarted)?;
        inbound.send(rx).map_err(|_| ComponentError::Closed)
    }

    /// The lifecycle driven by this loop
    #[inline]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

#[cfg(test)]
#[path = "consume_loop_test.rs"]
mod consume_loop_test;
