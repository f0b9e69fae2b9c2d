//! CLI argument parsing for jolokia-gateway
//!
//! This module provides the command-line interface using clap derive macros.
//!
//! # Options
//!
//! - `--config` / `-c`: Configuration file path (default: config.yaml, env: JOLOKIA_GATEWAY_CONFIG)
//! - `--port` / `-p`: Server port (env: JOLOKIA_GATEWAY_PORT)
//! - `--bind-address`: Server bind address (env: JOLOKIA_GATEWAY_BIND_ADDRESS)
//! - `--context-path`: Path the gateway is mounted on (env: JOLOKIA_GATEWAY_CONTEXT_PATH)
//! - `--upstream-url`: Upstream Jolokia agent URL (env: JOLOKIA_GATEWAY_UPSTREAM_URL)
//! - `--upstream-timeout`: Upstream timeout in milliseconds (env: JOLOKIA_GATEWAY_UPSTREAM_TIMEOUT)
//! - `--username` / `--password`: Upstream basic auth (env: JOLOKIA_GATEWAY_USERNAME / _PASSWORD)
//! - `--tls-enabled`, `--tls-cert-file`, `--tls-key-file`: HTTPS for the gateway itself
//! - `--validate`: Validate configuration without starting server
//! - `--decode <PATH>`: Decode a GET path info and print the request, then exit
//! - `--log-level` / `-l`: Log level (trace/debug/info/warn/error, env: JOLOKIA_GATEWAY_LOG_LEVEL)
//! - `--output-format`: Output format for --decode (text/json/yaml)
//!
//! # Precedence
//!
//! Configuration values are resolved in the following order (highest to lowest priority):
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::Config;

/// jolokia-gateway - Validating Jolokia HTTP-to-JMX gateway
///
/// Decodes and validates Jolokia GET and POST requests, then forwards
/// them to an upstream Jolokia agent.
///
/// Environment variables can be used for all configuration options.
/// CLI arguments take precedence over environment variables,
/// which take precedence over config file values.
#[derive(Parser, Debug)]
#[command(name = "jolokia-gateway")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        env = "JOLOKIA_GATEWAY_CONFIG"
    )]
    pub config: PathBuf,

    /// Server port (overrides config file)
    #[arg(short, long, value_name = "PORT", env = "JOLOKIA_GATEWAY_PORT")]
    pub port: Option<u16>,

    /// Server bind address (overrides config file)
    /// Supported values: IP addresses (0.0.0.0, 127.0.0.1, ::1) or "localhost"
    #[arg(long, value_name = "ADDRESS", env = "JOLOKIA_GATEWAY_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Context path the gateway is mounted on (overrides config file)
    #[arg(long, value_name = "PATH", env = "JOLOKIA_GATEWAY_CONTEXT_PATH")]
    pub context_path: Option<String>,

    /// Upstream Jolokia agent URL (overrides config file)
    #[arg(long, value_name = "URL", env = "JOLOKIA_GATEWAY_UPSTREAM_URL")]
    pub upstream_url: Option<String>,

    /// Upstream HTTP timeout in milliseconds (overrides config file)
    #[arg(long, value_name = "MS", env = "JOLOKIA_GATEWAY_UPSTREAM_TIMEOUT")]
    pub upstream_timeout: Option<u64>,

    /// Upstream authentication username (overrides config file)
    #[arg(long, value_name = "USERNAME", env = "JOLOKIA_GATEWAY_USERNAME")]
    pub username: Option<String>,

    /// Upstream authentication password (overrides config file)
    #[arg(long, value_name = "PASSWORD", env = "JOLOKIA_GATEWAY_PASSWORD")]
    pub password: Option<String>,

    /// Enable TLS/HTTPS for the gateway endpoint (overrides config file)
    #[arg(long, env = "JOLOKIA_GATEWAY_TLS_ENABLED")]
    pub tls_enabled: Option<bool>,

    /// Path to TLS certificate file in PEM format (overrides config file)
    #[arg(long, value_name = "FILE", env = "JOLOKIA_GATEWAY_TLS_CERT_FILE")]
    pub tls_cert_file: Option<String>,

    /// Path to TLS private key file in PEM format (overrides config file)
    #[arg(long, value_name = "FILE", env = "JOLOKIA_GATEWAY_TLS_KEY_FILE")]
    pub tls_key_file: Option<String>,

    /// Validate configuration without starting server
    #[arg(long)]
    pub validate: bool,

    /// Decode a GET path info (e.g. /read/java.lang:type=Memory) and print it
    #[arg(long, value_name = "PATH")]
    pub decode: Option<String>,

    /// Log level
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        env = "JOLOKIA_GATEWAY_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "text",
        env = "JOLOKIA_GATEWAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Output format for --decode
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

impl Cli {
    /// Apply CLI and environment overrides on top of the file configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref bind_address) = self.bind_address {
            config.server.bind_address = bind_address.clone();
        }
        if let Some(ref context_path) = self.context_path {
            config.server.context_path = context_path.clone();
        }
        if let Some(ref url) = self.upstream_url {
            config.upstream.url = url.clone();
        }
        if let Some(timeout) = self.upstream_timeout {
            config.upstream.timeout_ms = timeout;
        }
        if let Some(ref username) = self.username {
            config.upstream.username = Some(username.clone());
        }
        if let Some(ref password) = self.password {
            config.upstream.password = Some(password.clone());
        }
        if let Some(enabled) = self.tls_enabled {
            config.server.tls.enabled = enabled;
        }
        if let Some(ref cert) = self.tls_cert_file {
            config.server.tls.cert_file = Some(cert.clone());
        }
        if let Some(ref key) = self.tls_key_file {
            config.server.tls.key_file = Some(key.clone());
        }
    }
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level - default
    Info,
    /// Warn level
    Warn,
    /// Error level - least verbose
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Log output formats
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Output format options for decode mode
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}
