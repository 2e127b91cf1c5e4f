//! Processor pipeline configuration
//!
//! Processors run in declaration order on every batch. An empty list means
//! input feeds output directly.
//!
//! ```toml
//! [[pipeline.processors]]
//! type = "split"
//! size = 1
//! ```

use serde::Deserialize;

/// Processor pipeline configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    pub processors: Vec<ProcessorConfig>,
}

/// One processor, tagged by `type`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessorConfig {
    /// Pass batches through unchanged
    Noop,
    /// Break each batch into batches of at most `size` parts
    Split {
        #[serde(default = "default_split_size")]
        size: usize,
    },
}

fn default_split_size() -> usize {
    1
}

impl ProcessorConfig {
    /// Processor type name for logs
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Split { .. } => "split",
        }
    }
}
