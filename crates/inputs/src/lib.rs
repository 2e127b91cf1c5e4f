//! Conduit - Inputs
//!
//! The producing end of a stream. A `Reader` yields batches; `ReaderInput`
//! turns each one into a transaction, forwards it downstream and reports the
//! downstream acknowledgment back to the reader.
//!
//! ```text
//! Reader ──read()──> ReaderInput ──Transaction──> [downstream]
//!   ^                     │
//!   └──── AckFn(result) ──┘ (tracked task per transaction)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let reader = GenerateReader::new(vec!["hello world".into()], 0, Duration::from_secs(1));
//! let mut input = ReaderInput::new(reader, registry.as_ref(), ReaderOptions::default());
//! let rx = input.transactions().expect("transactions taken once");
//! output.consume(rx)?;
//! ```

mod error;
mod generate;
mod reader;

pub use error::ReadError;
pub use generate::GenerateReader;
pub use reader::{AckFn, Reader, ReaderInput, ReaderOptions, noop_ack};
