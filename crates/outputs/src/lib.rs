//! Conduit - Outputs
//!
//! Terminal `Streamed` components: the end of a stream, where every
//! transaction is finally acknowledged.
//!
//! # Outputs
//!
//! | Output | Delivery | Acknowledgment |
//! |--------|----------|----------------|
//! | `HttpServerOutput` | pulled by HTTP clients (single-shot, chunked stream, websocket) | `Ok` once written to the client |
//! | `WriterOutput<StdoutWriter>` | each part on its own line | write result |
//! | `WriterOutput<DropWriter>` | discarded | always `Ok` |
//!
//! # Example
//!
//! ```ignore
//! use conduit_outputs::{HttpServerConfig, HttpServerOutput};
//!
//! let config = HttpServerConfig::with_address("0.0.0.0:4196");
//! let mut output = HttpServerOutput::new(config, registry.as_ref())?;
//! output.consume(rx)?;
//! ```

pub mod http_server;
pub mod writer;

pub use http_server::{HttpServerConfig, HttpServerOutput};
pub use writer::{DropWriter, StdoutWriter, Writer, WriterOutput};
