//! Processor Chain - sequential batch processing
//!
//! Every processor receives each batch produced by the one before it, so a
//! split followed by another processor runs the second once per chunk. The
//! first error stops the chain and fails the whole input batch.

use conduit_message::Batch;

use crate::{ProcessResult, Processor};

#[cfg(test)]
#[path = "chain_test.rs"]
mod tests;

/// Chain of processors applied in order
#[derive(Default)]
pub struct Chain {
    processors: Vec<Box<dyn Processor>>,
}

impl Chain {
    pub fn new(processors: Vec<Box<dyn Processor>>) -> Self {
        Self { processors }
    }

    /// Create an empty chain (pass-through)
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Names of the processors, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Run a batch through every processor in sequence
    pub async fn process(&self, batch: Batch) -> ProcessResult<Vec<Batch>> {
        let mut current = vec![batch];

        for processor in &self.processors {
            let mut next = Vec::with_capacity(current.len());
            for batch in current {
                next.extend(processor.process(batch).await?);
            }
            if next.is_empty() {
                return Ok(next);
            }
            current = next;
        }

        Ok(current)
    }

    /// Close every processor
    pub async fn close(&self) {
        for processor in &self.processors {
            processor.close().await;
        }
    }
}
