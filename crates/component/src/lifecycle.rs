//! Lifecycle - two-phase shutdown coordinator
//!
//! Every component owns one `Lifecycle`. It tracks the component state and
//! carries two signals:
//!
//! - `close`: the stop request. Cancelled by the first `trigger_close` (or by
//!   `mark_closed`), observed by every task of the component in `select!`.
//! - `closed`: teardown finished. Cancelled by `mark_closed`, awaited by
//!   `wait_for_close`.
//!
//! ```text
//! Unstarted --start--> Running --trigger_close--> Closing --mark_closed--> Closed
//!     └──────────────trigger_close──────────────────┘
//! ```
//!
//! State transitions are compare-and-swap on an `AtomicU8`, so concurrent
//! close requests from several paths trigger teardown exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::ComponentError;

/// Component state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    Unstarted = 0,
    Running = 1,
    Closing = 2,
    Closed = 3,
}

impl State {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Unstarted,
            1 => Self::Running,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: AtomicU8,
    close: CancellationToken,
    closed: CancellationToken,
}

/// Shared lifecycle handle
///
/// Cloning is cheap; all clones observe the same state.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Create a lifecycle in the `Unstarted` state
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: AtomicU8::new(State::Unstarted as u8),
                close: CancellationToken::new(),
                closed: CancellationToken::new(),
            }),
        }
    }

    /// Current state
    #[inline]
    pub fn state(&self) -> State {
        State::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Move `Unstarted -> Running`
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` if running, `Closed` if closing or closed.
    pub fn start(&self) -> Result<(), ComponentError> {
        match self.inner.state.compare_exchange(
            State::Unstarted as u8,
            State::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(()),
            Err(current) if current == State::Running as u8 => Err(ComponentError::AlreadyStarted),
            Err(_) => Err(ComponentError::Closed),
        }
    }

    /// Request close
    ///
    /// Never blocks. Returns `true` only for the call that moved the
    /// component into `Closing`; every later call is a no-op.
    pub fn trigger_close(&self) -> bool {
        let mut current = self.inner.state.load(Ordering::Acquire);
        loop {
            if current >= State::Closing as u8 {
                return false;
            }
            match self.inner.state.compare_exchange_weak(
                current,
                State::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.inner.close.cancel();
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Record that teardown finished
    ///
    /// Idempotent. Also cancels the close signal so nothing keeps waiting on
    /// a component that already stopped on its own.
    pub fn mark_closed(&self) {
        let previous = self
            .inner
            .state
            .swap(State::Closed as u8, Ordering::AcqRel);
        if previous != State::Closed as u8 {
            self.inner.close.cancel();
            self.inner.closed.cancel();
        }
    }

    /// Wait until `mark_closed` or until `timeout` elapses
    ///
    /// Teardown continues in the background after a timeout.
    pub async fn wait_for_close(&self, timeout: Duration) -> Result<(), ComponentError> {
        tokio::time::timeout(timeout, self.inner.closed.cancelled())
            .await
            .map_err(|_| ComponentError::Timeout)
    }

    /// Handle to the close signal for use in `select!`
    #[inline]
    pub fn close_token(&self) -> CancellationToken {
        self.inner.close.clone()
    }

    /// Check if close was requested
    #[inline]
    pub fn is_closing(&self) -> bool {
        self.inner.close.is_cancelled()
    }

    /// Check if teardown finished
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled()
    }

    /// Wait for the close signal
    pub async fn closing(&self) {
        self.inner.close.cancelled().await
    }

    /// Guard that calls `mark_closed` when dropped
    pub fn closed_guard(&self) -> ClosedGuard {
        ClosedGuard {
            lifecycle: self.clone(),
        }
    }
}

/// Marks the lifecycle closed on drop
///
/// Held by the task that performs teardown, so the component reaches
/// `Closed` even if that task unwinds.
#[derive(Debug)]
#[must_use = "the lifecycle is marked closed as soon as the guard drops"]
pub struct ClosedGuard {
    lifecycle: Lifecycle,
}

impl Drop for ClosedGuard {
    fn drop(&mut self) {
        self.lifecycle.mark_closed();
    }
}

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod lifecycle_test;
