//! Jolokia response envelopes
//!
//! Builds the JSON objects returned to clients, and parses the ones an
//! upstream agent returns.
//!
//! - 성공: `{request?, value, status: 200, timestamp}`
//! - 실패: `{request?, status, error, error_type, stacktrace?, index?}`

use std::error::Error as StdError;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{DispatchError, RequestError};
use crate::request::{BatchFailure, BodyError, ConfigKey, JmxRequest, ObjectName, ProcessingConfig};

/// One response object
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ResponseEnvelope {
    /// Echo of the request
    #[serde(default)]
    pub request: Option<Value>,
    /// Result value (success only)
    #[serde(default)]
    pub value: Option<Value>,
    /// Status code, 200 on success
    pub status: u16,
    /// Unix epoch seconds
    #[serde(default)]
    pub timestamp: Option<u64>,
    /// Error message
    #[serde(default)]
    pub error: Option<String>,
    /// Error type name
    #[serde(default)]
    pub error_type: Option<String>,
    /// Error chain
    #[serde(default)]
    pub stacktrace: Option<String>,
    /// Position inside a batch
    #[serde(default)]
    pub index: Option<usize>,
}

impl ResponseEnvelope {
    /// Whether this is a success envelope
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Success envelope for `request`
    ///
    /// Values keyed by object names are rendered following the request's
    /// `objectNameKeyOrder`.
    pub fn success(request: &JmxRequest, value: Value) -> Self {
        let config = request.processing_config();
        Self {
            request: include_request(config).then(|| request.to_json()),
            value: Some(order_object_names(request, value)),
            status: 200,
            timestamp: Some(now()),
            ..Default::default()
        }
    }

    /// Error envelope for a request that failed upstream
    pub fn dispatch_error(request: &JmxRequest, error: &DispatchError) -> Self {
        let config = request.processing_config();
        Self {
            request: include_request(config).then(|| request.to_json()),
            status: error.http_status(),
            error: Some(error.to_string()),
            error_type: Some(error.error_type()),
            stacktrace: include_stacktrace(config).then(|| stacktrace(error)),
            timestamp: Some(now()),
            ..Default::default()
        }
    }

    /// Error envelope for a request that did not decode
    ///
    /// `request` is the offending JSON, echoed as received.
    pub fn request_error(
        error: &RequestError,
        request: Option<&Value>,
        config: &ProcessingConfig,
    ) -> Self {
        Self {
            request: request.filter(|_| include_request(config)).cloned(),
            status: error.status(),
            error: Some(error.to_string()),
            error_type: Some(error.kind().to_string()),
            stacktrace: include_stacktrace(config).then(|| stacktrace(error)),
            timestamp: Some(now()),
            ..Default::default()
        }
    }

    /// Error element of a batch, carrying the element's position
    ///
    /// The element JSON is always attached since it is the only thing that
    /// identifies a request that never decoded.
    pub fn batch_failure(failure: &BatchFailure, config: &ProcessingConfig) -> Self {
        Self {
            request: Some(failure.request.clone()),
            index: Some(failure.index),
            ..Self::request_error(&failure.error, None, config)
        }
    }

    /// Error envelope for a POST body that did not decode
    pub fn body_error(error: &BodyError, config: &ProcessingConfig) -> Self {
        match error {
            BodyError::Batch(failure) => Self::batch_failure(failure, config),
            BodyError::Single { .. } => Self::request_error(error.error(), error.request(), config),
        }
    }

    /// JSON form
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(request) = &self.request {
            map.insert("request".to_string(), request.clone());
        }
        // 성공 응답은 null 값도 그대로 내보낸다
        if self.is_success() || self.value.is_some() {
            map.insert("value".to_string(), self.value.clone().unwrap_or(Value::Null));
        }
        map.insert("status".to_string(), Value::from(self.status));
        if let Some(timestamp) = self.timestamp {
            map.insert("timestamp".to_string(), Value::from(timestamp));
        }
        if let Some(error) = &self.error {
            map.insert("error".to_string(), Value::String(error.clone()));
        }
        if let Some(error_type) = &self.error_type {
            map.insert("error_type".to_string(), Value::String(error_type.clone()));
        }
        if let Some(stacktrace) = &self.stacktrace {
            map.insert("stacktrace".to_string(), Value::String(stacktrace.clone()));
        }
        if let Some(index) = self.index {
            map.insert("index".to_string(), Value::from(index));
        }
        Value::Object(map)
    }
}

impl Serialize for ResponseEnvelope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

/// Re-render object names in a result value following the request's key order
///
/// Search results are lists of names; reads with a pattern name return an
/// object keyed by the matching names. Other values are left alone, as are
/// entries that do not parse as object names.
pub fn order_object_names(request: &JmxRequest, value: Value) -> Value {
    match (request, value) {
        (JmxRequest::Search(_), Value::Array(names)) => Value::Array(
            names
                .into_iter()
                .map(|name| match name {
                    Value::String(s) => Value::String(reorder(request, s)),
                    other => other,
                })
                .collect(),
        ),
        (JmxRequest::Read(_), Value::Object(map))
            if request.object_name().is_some_and(ObjectName::is_pattern) =>
        {
            Value::Object(
                map.into_iter()
                    .map(|(key, v)| (reorder(request, key), v))
                    .collect::<Map<String, Value>>(),
            )
        }
        (_, value) => value,
    }
}

fn reorder(request: &JmxRequest, name: String) -> String {
    match ObjectName::parse(&name) {
        Ok(parsed) => request.ordered_object_name(&parsed),
        Err(_) => name,
    }
}

fn include_request(config: &ProcessingConfig) -> bool {
    config.get_bool(ConfigKey::IncludeRequest)
}

fn include_stacktrace(config: &ProcessingConfig) -> bool {
    config.get_bool(ConfigKey::IncludeStackTrace)
}

/// Error message followed by its source chain
fn stacktrace(error: &dyn StdError) -> String {
    let mut ret = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        ret.push_str("\nCaused by: ");
        ret.push_str(&cause.to_string());
        source = cause.source();
    }
    ret
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
