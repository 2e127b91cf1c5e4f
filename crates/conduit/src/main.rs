//! Conduit - stream batches from an input through processors to outputs
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults (generate -> stdout)
//! conduit
//!
//! # Run a config file with a custom shutdown budget
//! conduit --config conduit.toml --shutdown-timeout 30s
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use conduit::Stream;
use conduit_config::{Config, LogConfig, LogFormat, LogOutput};
use conduit_metrics::{LocalRegistry, MetricsReporter, Registry};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Conduit - stream batches from an input through processors to outputs
#[derive(Parser, Debug)]
#[command(name = "conduit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (error if specified but not found)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long)]
    log_level: Option<String>,

    /// How long shutdown waits for components to close
    #[arg(long, default_value = "20s", value_parser = parse_duration)]
    shutdown_timeout: Duration,
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.log.level.as_str().to_string());
    init_logging(&level, &config.log)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| "(default)".into()),
        "conduit starting"
    );

    if let Err(e) = run(config, cli.shutdown_timeout).await {
        error!(error = %e, "conduit error");
        return Err(e);
    }

    info!("conduit shutdown complete");
    Ok(())
}

async fn run(config: Config, shutdown_timeout: Duration) -> Result<()> {
    let registry: Arc<dyn Registry> = Arc::new(LocalRegistry::new());

    let cancel = CancellationToken::new();
    let reporter = MetricsReporter::new(Arc::clone(&registry), &config.metrics);
    let reporter_task = tokio::spawn(reporter.run(cancel.clone()));

    let stream = Stream::new(&config, &registry)?;

    tokio::select! {
        _ = wait_for_shutdown() => info!("shutdown signal received, stopping stream..."),
        _ = stream.wait_until_done() => info!("stream finished"),
    }

    if !stream.shutdown(shutdown_timeout).await {
        warn!(timeout = ?shutdown_timeout, "stream did not shut down cleanly");
    }

    cancel.cancel();
    if let Err(e) = reporter_task.await {
        warn!(error = %e, "metrics reporter panicked");
    }
    Ok(())
}

/// Load the config file, or defaults when none is given
fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    if !path.exists() {
        anyhow::bail!("config file not found: {}", path.display());
    }
    Config::from_file(path).with_context(|| format!("failed to load configuration from {}", path.display()))
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match (config.format, config.output) {
        (LogFormat::Console, LogOutput::Stdout) => registry.with(fmt::layer().with_target(true)).init(),
        (LogFormat::Console, LogOutput::Stderr) => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
        (LogFormat::Json, LogOutput::Stdout) => registry.with(fmt::layer().json()).init(),
        (LogFormat::Json, LogOutput::Stderr) => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
