//! jolokia-gateway library
//!
//! This crate provides the Jolokia request core: JMX ObjectName handling,
//! processing options, request decoding from GET paths and POST bodies,
//! and the JSON request echo. On top of it sits a validating HTTP gateway
//! that forwards decoded requests to an upstream Jolokia agent.

pub mod cli;
pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

use anyhow::Result;
use crate::cli::LogFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging subsystem
///
/// Logs go to stderr so that decode output on stdout stays clean.
///
/// # Arguments
/// * `level` - Log level string (trace, debug, info, warn, error)
/// * `format` - Plain text lines or JSON objects
///
/// # Errors
/// Returns an error if the logging system fails to initialize
pub fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
