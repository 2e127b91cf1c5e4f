//! Noop Processor - pass-through
//!
//! Useful as a placeholder and for measuring pipeline overhead.

use std::future::Future;
use std::pin::Pin;

use conduit_message::Batch;

use crate::{ProcessResult, Processor};

/// A processor that passes batches through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProcessor;

impl NoopProcessor {
    #[inline]
    pub const fn new() -> Self {
        Self
    }
}

impl Processor for NoopProcessor {
    fn process<'a>(
        &'a self,
        batch: Batch,
    ) -> Pin<Box<dyn Future<Output = ProcessResult<Vec<Batch>>> + Send + 'a>> {
        Box::pin(async move { Ok(vec![batch]) })
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_passes_through() {
        let batch = Batch::quick(["a", "b"]);
        let out = NoopProcessor::new().process(batch.clone()).await.unwrap();
        assert_eq!(out, vec![batch]);
    }
}
