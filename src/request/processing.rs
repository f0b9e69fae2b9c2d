//! Processing configuration
//!
//! Per-request options such as `ignoreErrors` or `objectNameKeyOrder`.
//! The gateway builds one [`ProcessingConfig`] per HTTP request from the
//! config file defaults and the query string; every request decoded from
//! that HTTP request shares it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use once_cell::sync::Lazy;

/// Processing options known to the request core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigKey {
    /// `canonical` (default) or `initial` ordering of object name keys
    ObjectNameKeyOrder,
    /// Turn batch element failures into error elements
    IgnoreErrors,
    /// Echo the request in every response
    IncludeRequest,
    /// Attach the error source chain to error responses
    IncludeStackTrace,
    /// Maximum depth when serializing values
    MaxDepth,
    /// Maximum size of collections in returned values
    MaxCollectionSize,
    /// Maximum number of objects in returned values
    MaxObjects,
    /// Serialize exceptions as JSON objects
    SerializeException,
    /// Response content type
    MimeType,
}

impl ConfigKey {
    /// All known keys
    pub const ALL: [ConfigKey; 9] = [
        ConfigKey::ObjectNameKeyOrder,
        ConfigKey::IgnoreErrors,
        ConfigKey::IncludeRequest,
        ConfigKey::IncludeStackTrace,
        ConfigKey::MaxDepth,
        ConfigKey::MaxCollectionSize,
        ConfigKey::MaxObjects,
        ConfigKey::SerializeException,
        ConfigKey::MimeType,
    ];

    /// Name used in query strings and config files
    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::ObjectNameKeyOrder => "objectNameKeyOrder",
            ConfigKey::IgnoreErrors => "ignoreErrors",
            ConfigKey::IncludeRequest => "includeRequest",
            ConfigKey::IncludeStackTrace => "includeStackTrace",
            ConfigKey::MaxDepth => "maxDepth",
            ConfigKey::MaxCollectionSize => "maxCollectionSize",
            ConfigKey::MaxObjects => "maxObjects",
            ConfigKey::SerializeException => "serializeException",
            ConfigKey::MimeType => "mimeType",
        }
    }

    /// Constant-style name, e.g. `OBJECT_NAME_KEY_ORDER`
    pub fn constant_name(&self) -> &'static str {
        match self {
            ConfigKey::ObjectNameKeyOrder => "OBJECT_NAME_KEY_ORDER",
            ConfigKey::IgnoreErrors => "IGNORE_ERRORS",
            ConfigKey::IncludeRequest => "INCLUDE_REQUEST",
            ConfigKey::IncludeStackTrace => "INCLUDE_STACKTRACE",
            ConfigKey::MaxDepth => "MAX_DEPTH",
            ConfigKey::MaxCollectionSize => "MAX_COLLECTION_SIZE",
            ConfigKey::MaxObjects => "MAX_OBJECTS",
            ConfigKey::SerializeException => "SERIALIZE_EXCEPTION",
            ConfigKey::MimeType => "MIME_TYPE",
        }
    }

    /// Value used when the key is not configured
    pub fn default_value(&self) -> Option<&'static str> {
        match self {
            ConfigKey::ObjectNameKeyOrder => Some("canonical"),
            ConfigKey::IgnoreErrors => Some("false"),
            ConfigKey::IncludeRequest => Some("true"),
            ConfigKey::IncludeStackTrace => Some("false"),
            ConfigKey::SerializeException => Some("false"),
            ConfigKey::MimeType => Some("text/plain"),
            ConfigKey::MaxDepth | ConfigKey::MaxCollectionSize | ConfigKey::MaxObjects => None,
        }
    }

    /// Whether the gateway itself consumes the key
    ///
    /// Keys the gateway does not consume are forwarded to the upstream agent.
    pub fn is_gateway_local(&self) -> bool {
        matches!(
            self,
            ConfigKey::ObjectNameKeyOrder
                | ConfigKey::IncludeRequest
                | ConfigKey::IncludeStackTrace
                | ConfigKey::IgnoreErrors
        )
    }

    /// Look up a key by its wire name or constant name
    pub fn from_key_name(name: &str) -> Option<Self> {
        KEYS_BY_NAME.get(name).copied()
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key_name())
    }
}

static KEYS_BY_NAME: Lazy<HashMap<&'static str, ConfigKey>> = Lazy::new(|| {
    ConfigKey::ALL
        .iter()
        .flat_map(|k| [(k.key_name(), *k), (k.constant_name(), *k)])
        .collect()
});

/// Object name key ordering policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyOrder {
    /// Keys sorted lexicographically
    #[default]
    Canonical,
    /// Keys in authoring order
    Initial,
}

impl KeyOrder {
    /// Interpret a configured value
    ///
    /// Only the exact value `initial` selects initial order; anything else,
    /// unknown values included, falls back to canonical.
    pub fn from_config_value(value: Option<&str>) -> Self {
        match value {
            Some("initial") => KeyOrder::Initial,
            Some("canonical") | None => KeyOrder::Canonical,
            Some(other) => {
                tracing::debug!(
                    value = other,
                    "Unknown objectNameKeyOrder value; using canonical order"
                );
                KeyOrder::Canonical
            }
        }
    }
}

/// Read-only processing options shared by the requests of one HTTP call
///
/// Recognized keys are stored under their wire name, anything else is kept
/// verbatim for downstream consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingConfig {
    params: Arc<BTreeMap<String, String>>,
}

impl ProcessingConfig {
    /// Empty configuration (all defaults)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from name/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let params = pairs
            .into_iter()
            .map(|(k, v)| (normalize_key(k.as_ref()), v.into()))
            .collect();
        Self {
            params: Arc::new(params),
        }
    }

    /// Build from an URL query string (`a=1&b=2`)
    pub fn from_query(query: &str) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).into_owned())
    }

    /// Return a configuration where `overrides` win over `self`
    pub fn merged_with(&self, overrides: &ProcessingConfig) -> Self {
        if overrides.params.is_empty() {
            return self.clone();
        }
        let mut params = (*self.params).clone();
        params.extend(
            overrides
                .params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Self {
            params: Arc::new(params),
        }
    }

    /// Set one option, returning the new configuration
    pub fn with(&self, key: ConfigKey, value: impl Into<String>) -> Self {
        self.merged_with(&Self::from_pairs([(key.key_name(), value.into())]))
    }

    /// Configured value or the key's default
    pub fn get(&self, key: ConfigKey) -> Option<&str> {
        self.params
            .get(key.key_name())
            .map(String::as_str)
            .or_else(|| key.default_value())
    }

    /// Configured value of any key, recognized or not, without defaults
    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.params.get(&normalize_key(name)).map(String::as_str)
    }

    /// Boolean option; `true` in any case counts as set
    pub fn get_bool(&self, key: ConfigKey) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Ordering policy for object names
    pub fn key_order(&self) -> KeyOrder {
        let configured = self
            .params
            .get(ConfigKey::ObjectNameKeyOrder.key_name())
            .map(String::as_str);
        KeyOrder::from_config_value(configured)
    }

    /// Options to forward to the upstream agent
    pub fn forwarded_params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .iter()
            .filter(|(k, _)| {
                ConfigKey::from_key_name(k)
                    .map(|key| !key.is_gateway_local())
                    .unwrap_or(true)
            })
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// All configured options
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of configured options
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// True when nothing is configured
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

fn normalize_key(name: &str) -> String {
    ConfigKey::from_key_name(name)
        .map(|k| k.key_name().to_string())
        .unwrap_or_else(|| name.to_string())
}
