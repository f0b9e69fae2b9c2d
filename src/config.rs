//! Configuration management for jolokia-gateway
//!
//! Handles loading and validating configuration from YAML files.
//!
//! ```yaml
//! server:
//!   port: 8080
//!   context_path: /jolokia
//! upstream:
//!   url: http://localhost:8778/jolokia
//!   timeout_ms: 5000
//! processing:
//!   ignoreErrors: true
//! policy:
//!   disabled_types: [exec]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::request::{ProcessingConfig, RequestPolicy, RequestType};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing the configuration file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream Jolokia agent
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Default processing options, overridable per HTTP request
    #[serde(default)]
    pub processing: BTreeMap<String, serde_yaml::Value>,

    /// Request type policy
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Server bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Path the gateway is mounted on
    #[serde(default = "default_context_path")]
    pub context_path: String,

    /// Allow cross-origin browser clients
    #[serde(default)]
    pub cors_enabled: bool,

    /// TLS settings
    #[serde(default)]
    pub tls: TlsConfig,
}

/// TLS configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Serve HTTPS instead of HTTP
    #[serde(default)]
    pub enabled: bool,

    /// Certificate chain in PEM format
    pub cert_file: Option<String>,

    /// Private key in PEM format
    pub key_file: Option<String>,
}

/// Upstream Jolokia agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Jolokia endpoint URL
    #[serde(default = "default_upstream_url")]
    pub url: String,

    /// Optional username for basic auth
    pub username: Option<String>,

    /// Optional password for basic auth
    pub password: Option<String>,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Retries for failed idempotent requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Request type policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Request types rejected with `UnsupportedType`
    #[serde(default)]
    pub disabled_types: Vec<String>,
}

// Default value functions
fn default_upstream_url() -> String {
    "http://localhost:8778/jolokia".to_string()
}

fn default_timeout() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    3
}

fn default_port() -> u16 {
    8080
}

fn default_context_path() -> String {
    "/jolokia".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            username: None,
            password: None,
            timeout_ms: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            context_path: default_context_path(),
            cors_enabled: false,
            tls: TlsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated
    ///
    /// # Note
    /// - If the file doesn't exist, returns `ConfigError::ReadError`
    /// - Use `Config::load_or_default()` if you want fallback to defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, falling back to defaults if not found
    ///
    /// Use this for optional configuration files (e.g., when running without explicit config)
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Validate the configuration
    ///
    /// Call again after applying CLI overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if !self.server.context_path.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "Context path must start with '/'".to_string(),
            ));
        }

        if self.server.context_path.trim_end_matches('/') == "/health" {
            return Err(ConfigError::ValidationError(
                "Context path '/health' is reserved".to_string(),
            ));
        }

        if self.server.tls.enabled
            && (self.server.tls.cert_file.is_none() || self.server.tls.key_file.is_none())
        {
            return Err(ConfigError::ValidationError(
                "TLS requires both cert_file and key_file".to_string(),
            ));
        }

        let upstream = url::Url::parse(&self.upstream.url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "Invalid upstream url '{}': {}",
                self.upstream.url, e
            ))
        })?;
        if !matches!(upstream.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "Upstream url must use http or https, got '{}'",
                upstream.scheme()
            )));
        }

        if self.upstream.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "Upstream timeout must be greater than 0".to_string(),
            ));
        }

        self.disabled_types()?;
        self.processing_pairs()?;

        Ok(())
    }

    /// Context path without a trailing slash; `""` for the root
    pub fn context_path(&self) -> &str {
        self.server.context_path.trim_end_matches('/')
    }

    /// Request types switched off by the policy section
    pub fn disabled_types(&self) -> Result<Vec<RequestType>, ConfigError> {
        self.policy
            .disabled_types
            .iter()
            .map(|t| {
                RequestType::from_tag(t).map_err(|_| {
                    ConfigError::ValidationError(format!("Unknown request type '{}' in policy", t))
                })
            })
            .collect()
    }

    /// Policy enforced by the request decoder
    pub fn request_policy(&self) -> Result<RequestPolicy, ConfigError> {
        Ok(RequestPolicy::with_disabled(self.disabled_types()?))
    }

    /// Processing options configured as defaults
    pub fn processing_defaults(&self) -> Result<ProcessingConfig, ConfigError> {
        Ok(ProcessingConfig::from_pairs(self.processing_pairs()?))
    }

    fn processing_pairs(&self) -> Result<Vec<(String, String)>, ConfigError> {
        self.processing
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    _ => {
                        return Err(ConfigError::ValidationError(format!(
                            "Processing option '{}' must be a scalar",
                            key
                        )))
                    }
                };
                Ok((key.clone(), value))
            })
            .collect()
    }
}
