//! Conduit - Component
//!
//! The lifecycle contract shared by every stage of a stream.
//!
//! # Architecture
//!
//! ```text
//!            consume(rx)                 close_async()        wait_for_close(t)
//! Unstarted ───────────> Running ──────────────────> Closing ──────────────────> Closed
//!     │                                                 ▲
//!     └───────────────── close_async() ─────────────────┘
//! ```
//!
//! # Key Design
//!
//! - **`Streamed` / `Input` traits**: object-safe (`Box<dyn Streamed>`), so a
//!   broker is itself a `Streamed` and can sit below another broker
//! - **`Lifecycle`**: atomic state plus two cancellation tokens; the close
//!   signal is idempotent and teardown runs exactly once
//! - **`ConsumeLoop`**: the coordinating task is spawned at construction, so
//!   a component closed before it was started still tears down cleanly
//! - **Close-aware flow helpers**: every wait on input, downstream capacity
//!   or acknowledgment races the close signal
//!
//! # Example
//!
//! ```ignore
//! let lifecycle = Lifecycle::new();
//! let close = lifecycle.close_token();
//! let consume_loop = ConsumeLoop::spawn("printer", lifecycle, move |mut rx| async move {
//!     while let Some(transaction) = next_transaction(&mut rx, &close).await {
//!         println!("{} parts", transaction.payload().len());
//!         transaction.ack(Ok(()));
//!     }
//! }, async {});
//!
//! consume_loop.consume(rx)?;
//! ```

mod consume_loop;
mod error;
mod flow;
mod lifecycle;
mod streamed;

pub use consume_loop::ConsumeLoop;
pub use error::ComponentError;
pub use flow::{Forwarded, await_ack, forward, next_transaction, reject_pending};
pub use lifecycle::{ClosedGuard, Lifecycle, State};
pub use streamed::{Closable, Input, Streamed, close_all};
