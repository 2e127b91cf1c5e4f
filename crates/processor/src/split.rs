//! Split Processor - break batches into smaller ones
//!
//! Each output batch holds at most `size` parts, in order. An empty batch
//! produces no output, so it is acknowledged without reaching the output.

use std::future::Future;
use std::pin::Pin;

use conduit_message::Batch;

use crate::{ProcessError, ProcessResult, Processor};

/// Splits batches into chunks of at most `size` parts
#[derive(Debug, Clone, Copy)]
pub struct SplitProcessor {
    size: usize,
}

impl SplitProcessor {
    /// Create a split processor
    ///
    /// # Errors
    ///
    /// `Config` if `size` is zero.
    pub fn new(size: usize) -> Result<Self, ProcessError> {
        if size == 0 {
            return Err(ProcessError::config("split size must be at least 1"));
        }
        Ok(Self { size })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Processor for SplitProcessor {
    fn process<'a>(
        &'a self,
        batch: Batch,
    ) -> Pin<Box<dyn Future<Output = ProcessResult<Vec<Batch>>> + Send + 'a>> {
        Box::pin(async move { Ok(batch.chunks(self.size)) })
    }

    fn name(&self) -> &'static str {
        "split"
    }
}
