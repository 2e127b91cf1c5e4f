//! Stream - one input, one processor pipeline, one output tree

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use conduit_component::{Closable, Input, Streamed};
use conduit_config::Config;
use conduit_metrics::Registry;
use conduit_processor::Pipeline;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::builder::{build_input, build_output, build_pipeline};

/// How long `wait_until_done` waits between checks
const IDLE_WAIT: Duration = Duration::from_secs(3600);

/// A wired, running stream
pub struct Stream {
    input: Box<dyn Input>,
    pipeline: Pipeline,
    output: Box<dyn Streamed>,
}

impl Stream {
    /// Build every component and connect them
    ///
    /// Must be called inside a tokio runtime. The input starts reading
    /// before this returns.
    pub fn new(config: &Config, registry: &Arc<dyn Registry>) -> Result<Self> {
        let mut output = build_output(&config.output, registry).context("failed to build output")?;
        let mut pipeline = build_pipeline(&config.pipeline, registry).context("failed to build pipeline")?;
        let mut input = build_input(&config.input, registry);

        let wired = connect(input.as_mut(), &mut pipeline, output.as_mut());
        if let Err(e) = wired {
            input.close_async();
            pipeline.close_async();
            output.close_async();
            return Err(e);
        }

        info!(
            input = config.input.type_name(),
            processors = config.pipeline.processors.len(),
            output = config.output.type_name(),
            "stream running"
        );

        Ok(Self {
            input,
            pipeline,
            output,
        })
    }

    /// Resolve once the output has closed
    ///
    /// The output closes after the input is exhausted and everything in
    /// flight has been delivered, or when it fails for good.
    pub async fn wait_until_done(&self) {
        loop {
            match self.output.wait_for_close(IDLE_WAIT).await {
                Err(e) if e.is_timeout() => continue,
                _ => return,
            }
        }
    }

    /// Two-phase shutdown
    ///
    /// Signals input, pipeline and output, then waits for each in turn
    /// against a shared deadline. Returns `false` if anything failed to
    /// close in time.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        info!(timeout = ?timeout, "closing stream");
        self.input.close_async();
        self.pipeline.close_async();
        self.output.close_async();

        let deadline = Instant::now() + timeout;
        let input = wait_closed("input", self.input.as_ref(), deadline).await;
        let pipeline = wait_closed("pipeline", &self.pipeline, deadline).await;
        let output = wait_closed("output", self.output.as_ref(), deadline).await;
        input && pipeline && output
    }

    /// Whether the input reports a live connection to its source
    pub fn input_connected(&self) -> bool {
        self.input.connected()
    }

    /// Whether the output reports a live connection to its target
    pub fn output_connected(&self) -> bool {
        self.output.connected()
    }
}

fn connect(input: &mut dyn Input, pipeline: &mut Pipeline, output: &mut dyn Streamed) -> Result<()> {
    let produced = input.transactions().context("input stream already taken")?;
    pipeline.consume(produced).context("failed to start pipeline")?;

    let processed = Input::transactions(pipeline).context("pipeline stream already taken")?;
    output.consume(processed).context("failed to start output")?;
    debug!("stream connected");
    Ok(())
}

async fn wait_closed<C: Closable + ?Sized>(name: &'static str, component: &C, deadline: Instant) -> bool {
    let remaining = deadline.saturating_duration_since(Instant::now());
    match component.wait_for_close(remaining).await {
        Ok(()) => {
            debug!(component = name, "closed");
            true
        }
        Err(e) if e.is_timeout() => {
            warn!(component = name, "did not close within the shutdown timeout");
            false
        }
        Err(e) => {
            error!(component = name, error = %e, "failed to close");
            false
        }
    }
}
