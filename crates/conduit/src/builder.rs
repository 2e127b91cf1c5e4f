//! Build runtime components from configuration

use std::sync::Arc;

use conduit_broker::{Broker, Pattern};
use conduit_component::{ComponentError, Input, Streamed};
use conduit_config::{
    BrokerPattern, HttpServerOutputConfig, InputConfig, OutputConfig, PipelineConfig, ProcessorConfig,
};
use conduit_inputs::{GenerateReader, ReaderInput, ReaderOptions};
use conduit_metrics::Registry;
use conduit_outputs::{DropWriter, HttpServerConfig, HttpServerOutput, StdoutWriter, WriterOutput};
use conduit_processor::{Chain, NoopProcessor, Pipeline, ProcessError, Processor, SplitProcessor};
use conduit_ratelimit::{LocalRateLimit, MetricsRateLimit};

/// Build the input; it starts reading immediately
pub fn build_input(config: &InputConfig, registry: &Arc<dyn Registry>) -> Box<dyn Input> {
    match config {
        InputConfig::Generate(generate) => {
            let mut options = ReaderOptions::default();
            if let Some(rate_limit) = &generate.rate_limit {
                let local = LocalRateLimit::new(rate_limit.count, rate_limit.interval);
                options = options.with_rate_limit(Arc::new(MetricsRateLimit::new(local, registry.as_ref())));
            }

            let reader = GenerateReader::new(generate.messages.clone(), generate.count, generate.interval);
            Box::new(ReaderInput::new(reader, registry.as_ref(), options))
        }
    }
}

pub fn build_processor(config: &ProcessorConfig) -> Result<Box<dyn Processor>, ProcessError> {
    Ok(match config {
        ProcessorConfig::Noop => Box::new(NoopProcessor::new()),
        ProcessorConfig::Split { size } => Box::new(SplitProcessor::new(*size)?),
    })
}

/// Build the processor pipeline
pub fn build_pipeline(config: &PipelineConfig, registry: &Arc<dyn Registry>) -> Result<Pipeline, ProcessError> {
    let processors = config
        .processors
        .iter()
        .map(build_processor)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Pipeline::new(Chain::new(processors), registry.as_ref()))
}

/// Build an output tree
///
/// Brokers are built depth-first; each broker starts its children.
pub fn build_output(config: &OutputConfig, registry: &Arc<dyn Registry>) -> Result<Box<dyn Streamed>, ComponentError> {
    let output: Box<dyn Streamed> = match config {
        OutputConfig::Broker(broker) => {
            let outputs = broker
                .outputs
                .iter()
                .map(|child| build_output(child, registry))
                .collect::<Result<Vec<_>, _>>()?;
            Box::new(Broker::new(pattern(broker.pattern), outputs, registry.as_ref())?)
        }
        OutputConfig::HttpServer(http) => Box::new(HttpServerOutput::new(
            http_server_config(http),
            registry.as_ref(),
        )?),
        OutputConfig::Stdout(stdout) => Box::new(WriterOutput::new(
            StdoutWriter::new(stdout.delimiter.clone()),
            registry.as_ref(),
        )),
        OutputConfig::Drop => Box::new(WriterOutput::new(DropWriter::new(), registry.as_ref())),
    };

    tracing::debug!(output = config.type_name(), "output built");
    Ok(output)
}

/// Runtime settings for the HTTP server output from its file section
fn http_server_config(http: &HttpServerOutputConfig) -> HttpServerConfig {
    HttpServerConfig {
        address: http.address.clone(),
        path: http.path.clone(),
        stream_path: http.stream_path.clone(),
        ws_path: http.ws_path.clone(),
        allowed_verbs: http.allowed_verbs.clone(),
        timeout: http.timeout,
    }
}

fn pattern(pattern: BrokerPattern) -> Pattern {
    match pattern {
        BrokerPattern::RoundRobin => Pattern::RoundRobin,
        BrokerPattern::FanOut => Pattern::FanOut,
        BrokerPattern::Greedy => Pattern::Greedy,
        BrokerPattern::Try => Pattern::Try,
    }
}
