//! Stdout writer - one line per part
//!
//! Writes each part followed by a delimiter (newline unless configured) and
//! flushes once per batch. Not intended for high throughput.

use async_trait::async_trait;
use conduit_message::{Batch, DeliveryError};
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};

use super::Writer;

/// Default delimiter written after each part
const DEFAULT_DELIMITER: &[u8] = b"\n";

/// Writer that prints parts to stdout, or any other async sink
pub struct StdoutWriter<S = Stdout> {
    sink: S,
    delimiter: Vec<u8>,
}

impl StdoutWriter {
    /// Create a writer on the process stdout
    pub fn new(delimiter: Option<String>) -> Self {
        Self::with_sink(tokio::io::stdout(), delimiter)
    }
}

impl<S> StdoutWriter<S>
where
    S: AsyncWrite + Unpin + Send + 'static,
{
    /// Create a writer on an arbitrary sink
    pub fn with_sink(sink: S, delimiter: Option<String>) -> Self {
        Self {
            sink,
            delimiter: delimiter
                .map(String::into_bytes)
                .unwrap_or_else(|| DEFAULT_DELIMITER.to_vec()),
        }
    }

    /// Get a reference to the underlying sink
    #[inline]
    pub fn get_ref(&self) -> &S {
        &self.sink
    }
}

#[async_trait]
impl<S> Writer for StdoutWriter<S>
where
    S: AsyncWrite + Unpin + Send + 'static,
{
    fn name(&self) -> &'static str {
        "stdout"
    }

    async fn connect(&mut self) -> Result<(), DeliveryError> {
        Ok(())
    }

    async fn write(&mut self, batch: &Batch) -> Result<(), DeliveryError> {
        for part in batch.iter() {
            self.sink.write_all(part.data()).await?;
            self.sink.write_all(&self.delimiter).await?;
        }
        self.sink.flush().await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.sink.flush().await {
            tracing::debug!(error = %e, "stdout flush on close failed");
        }
    }
}
