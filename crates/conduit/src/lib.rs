//! Conduit - Stream assembly
//!
//! Turns a parsed `Config` into a running stream and shuts it down again.
//!
//! ```text
//! [input] ──Transaction──> [pipeline] ──Transaction──> [output]
//!    ^                         │ ^                        │
//!    └──────── ack ────────────┘ └────────── ack ─────────┘
//! ```
//!
//! The binary in `main.rs` adds the CLI, logging and signal handling on top.

mod builder;
mod stream;

pub use builder::{build_input, build_output, build_pipeline, build_processor};
pub use stream::Stream;
