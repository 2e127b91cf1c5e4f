//! Drop writer - discards all data
//!
//! Acknowledges every batch with `Ok` without doing any I/O. Useful for
//! measuring a stream without an output bottleneck.

use async_trait::async_trait;
use conduit_message::{Batch, DeliveryError};

use super::Writer;

/// Writer that discards every batch
#[derive(Debug, Default, Clone, Copy)]
pub struct DropWriter;

impl DropWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Writer for DropWriter {
    fn name(&self) -> &'static str {
        "drop"
    }

    async fn connect(&mut self) -> Result<(), DeliveryError> {
        Ok(())
    }

    async fn write(&mut self, batch: &Batch) -> Result<(), DeliveryError> {
        tracing::trace!(parts = batch.len(), "dropped batch");
        Ok(())
    }

    async fn close(&mut self) {}
}
