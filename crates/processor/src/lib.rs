//! Conduit - Processor
//!
//! Processors transform batches between an input and an output.
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────── Pipeline ─────────────┐
//! rx ──Transaction──>  │ [Processor 1] → [Processor 2] → … │ ──Transaction(s)──> tx
//!                      └───────────────────────────────────┘
//!      <──aggregated ack───────────────────────────────────────── acks
//! ```
//!
//! A processor may turn one batch into zero, one or many. The `Pipeline`
//! forwards every resulting batch as its own transaction and folds their
//! acknowledgments back into the acknowledgment of the original.
//!
//! # Modules
//!
//! - `chain` - Sequential processor execution
//! - `pipeline` - `Streamed` + `Input` stage running a chain
//! - `noop` - Pass-through processor
//! - `split` - Break batches into smaller ones
//!
//! # Example
//!
//! ```ignore
//! use conduit_processor::{Chain, Pipeline, SplitProcessor};
//!
//! let chain = Chain::new(vec![Box::new(SplitProcessor::new(1)?)]);
//! let mut pipeline = Pipeline::new(chain, registry.as_ref());
//!
//! pipeline.consume(input.transactions().unwrap())?;
//! output.consume(pipeline.transactions().unwrap())?;
//! ```

mod chain;
mod error;
pub mod noop;
mod pipeline;
pub mod split;

pub use chain::Chain;
pub use error::ProcessError;
pub use noop::NoopProcessor;
pub use pipeline::Pipeline;
pub use split::SplitProcessor;

use std::future::Future;
use std::pin::Pin;

use conduit_message::Batch;

/// Result type for processor operations
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Trait for batch processors
///
/// Implementors must be `Send + Sync`; a chain is shared between the
/// pipeline task and its teardown.
///
/// # Example
///
/// ```ignore
/// struct Upper;
///
/// impl Processor for Upper {
///     fn process<'a>(
///         &'a self,
///         batch: Batch,
///     ) -> Pin<Box<dyn Future<Output = ProcessResult<Vec<Batch>>> + Send + 'a>> {
///         Box::pin(async move {
///             let parts = batch.iter().map(|p| p.data().to_ascii_uppercase().into());
///             Ok(vec![Batch::new(parts.collect())])
///         })
///     }
///
///     fn name(&self) -> &'static str {
///         "upper"
///     }
/// }
/// ```
pub trait Processor: Send + Sync {
    /// Process a batch into zero or more batches
    ///
    /// An empty result drops the batch; it is acknowledged as delivered.
    /// An error fails the originating transaction.
    fn process<'a>(
        &'a self,
        batch: Batch,
    ) -> Pin<Box<dyn Future<Output = ProcessResult<Vec<Batch>>> + Send + 'a>>;

    /// Name of this processor for logging
    fn name(&self) -> &'static str;

    /// Release resources held by this processor
    ///
    /// Called once when the owning pipeline shuts down.
    fn close<'a>(&'a self) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async {})
    }
}
