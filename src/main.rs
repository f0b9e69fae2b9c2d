//! jolokia-gateway - Validating Jolokia HTTP-to-JMX gateway
//!
//! This binary decodes and validates Jolokia requests and forwards them
//! to an upstream Jolokia agent.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use jolokia_gateway::cli::{Cli, OutputFormat};
use jolokia_gateway::config::Config;
use jolokia_gateway::request::RequestDecoder;
use jolokia_gateway::server;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    jolokia_gateway::init_logging(&cli.log_level.to_string(), cli.log_format)?;

    // Load configuration, then apply CLI and environment overrides
    let mut config = Config::load_or_default(&cli.config)?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    if cli.validate {
        println!("Configuration is valid");
        return Ok(());
    }

    if let Some(ref pathinfo) = cli.decode {
        return decode(&config, pathinfo, cli.output_format);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting jolokia-gateway"
    );

    // Start server
    server::run(config).await?;

    Ok(())
}

/// Decode a GET path info with the configured policy and print the request
fn decode(config: &Config, pathinfo: &str, format: OutputFormat) -> Result<()> {
    let decoder = RequestDecoder::new(config.request_policy()?);
    let request = decoder.decode_url(pathinfo, &config.processing_defaults()?)?;

    match format {
        OutputFormat::Text => println!("{}", request),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&request.to_json())?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&request.to_json())?),
    }
    Ok(())
}
