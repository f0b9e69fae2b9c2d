//! Attributes shared by every request
//!
//! [`RequestHeader`] carries the request type, the path and the processing
//! configuration. [`ObjectNameRequest`] adds the object name that most
//! request types require.

use serde_json::{Map, Value};

use super::object_name::ObjectName;
use super::path::{join_escaped, normalize_path, split_escaped};
use super::processing::{ConfigKey, KeyOrder, ProcessingConfig};
use super::request_type::RequestType;
use crate::error::{RequestError, RequestResult};

/// Keys every request type understands
const COMMON_KEYS: &[&str] = &["type", "path", "target"];

/// Proxy target of a request (`{url, user, password, env}`)
///
/// The object is passed through untouched; accessors only read it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyTarget {
    raw: Map<String, Value>,
}

impl ProxyTarget {
    /// Validate a `target` value
    ///
    /// # Errors
    /// [`RequestError::MalformedRequest`] unless `value` is an object with a
    /// string `url`.
    pub fn from_json(value: &Value) -> RequestResult<Self> {
        let raw = value
            .as_object()
            .ok_or_else(|| RequestError::malformed("'target' must be a JSON object"))?;
        match raw.get("url") {
            Some(Value::String(_)) => Ok(Self { raw: raw.clone() }),
            _ => Err(RequestError::malformed("'target' requires a string 'url'")),
        }
    }

    /// Target service URL
    pub fn url(&self) -> &str {
        self.raw.get("url").and_then(Value::as_str).unwrap_or_default()
    }

    /// Optional user
    pub fn user(&self) -> Option<&str> {
        self.raw.get("user").and_then(Value::as_str)
    }

    /// Optional password
    pub fn password(&self) -> Option<&str> {
        self.raw.get("password").and_then(Value::as_str)
    }

    /// Optional environment map
    pub fn env(&self) -> Option<&Map<String, Value>> {
        self.raw.get("env").and_then(Value::as_object)
    }

    /// The object as received
    pub fn to_json(&self) -> Value {
        Value::Object(self.raw.clone())
    }
}

/// Type, path and processing configuration of a request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestHeader {
    request_type: RequestType,
    path: Vec<String>,
    config: ProcessingConfig,
    target: Option<ProxyTarget>,
    extra: Map<String, Value>,
}

impl RequestHeader {
    /// Header for a GET request
    pub fn new(request_type: RequestType, path: Vec<String>, config: ProcessingConfig) -> Self {
        Self {
            request_type,
            path: normalize_path(path),
            config,
            target: None,
            extra: Map::new(),
        }
    }

    /// Header for a POST request
    ///
    /// Reads `type`, `path` and `target`. Keys the request type does not
    /// know are kept so that they survive the echo.
    ///
    /// # Errors
    /// [`RequestError::MalformedRequest`] for a missing or unknown `type` or
    /// wrongly shaped fields, [`RequestError::Decode`] for a bad path escape.
    pub fn from_json(map: &Map<String, Value>, config: ProcessingConfig) -> RequestResult<Self> {
        let request_type = match map.get("type") {
            Some(Value::String(tag)) => RequestType::from_tag(tag)?,
            Some(_) => return Err(RequestError::malformed("'type' must be a string")),
            None => return Err(RequestError::malformed("missing 'type'")),
        };

        let path = match map.get("path") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(p)) => split_escaped(p)?,
            Some(_) => return Err(RequestError::malformed("'path' must be a string")),
        };

        let target = match map.get("target") {
            None | Some(Value::Null) => None,
            Some(value) => Some(ProxyTarget::from_json(value)?),
        };

        let known = request_type.payload_keys();
        let extra = map
            .iter()
            .filter(|(k, _)| !COMMON_KEYS.contains(&k.as_str()) && !known.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            request_type,
            path,
            config,
            target,
            extra,
        })
    }

    /// Request type
    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    /// Path segments, unescaped
    pub fn path_parts(&self) -> &[String] {
        &self.path
    }

    /// Path re-escaped into its string form
    pub fn path_string(&self) -> Option<String> {
        join_escaped(&self.path)
    }

    /// Processing configuration
    pub fn processing_config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Configured value of `key`, or its default
    pub fn processing_config_value(&self, key: ConfigKey) -> Option<&str> {
        self.config.get(key)
    }

    /// Proxy target, if any
    pub fn target(&self) -> Option<&ProxyTarget> {
        self.target.as_ref()
    }

    /// Keys not understood by the request type
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    pub(crate) fn replace_path(&mut self, path: Vec<String>) {
        self.path = normalize_path(path);
    }

    /// Render `name` following the `objectNameKeyOrder` option
    pub fn ordered_object_name(&self, name: &ObjectName) -> String {
        match self.config.key_order() {
            KeyOrder::Initial => name.initial(),
            KeyOrder::Canonical => name.canonical(),
        }
    }

    /// JSON echo of the shared attributes
    pub fn to_json(&self) -> Map<String, Value> {
        let mut ret = self.extra.clone();
        ret.insert(
            "type".to_string(),
            Value::String(self.request_type.as_str().to_string()),
        );
        if let Some(path) = self.path_string() {
            ret.insert("path".to_string(), Value::String(path));
        }
        if let Some(target) = &self.target {
            ret.insert("target".to_string(), target.to_json());
        }
        ret
    }

    /// Diagnostic tail shared by all requests
    pub fn info(&self) -> Option<String> {
        self.path_string().map(|p| format!("path = {}", p))
    }
}

/// Capability of requests that carry exactly one object name
pub trait HasObjectName {
    /// Parsed object name
    fn object_name(&self) -> &ObjectName;

    /// Request header
    fn header(&self) -> &RequestHeader;

    /// Object name in canonical form
    fn object_name_as_string(&self) -> String {
        self.object_name().canonical()
    }

    /// Render `name` following the `objectNameKeyOrder` option
    fn ordered_object_name(&self, name: &ObjectName) -> String {
        self.header().ordered_object_name(name)
    }
}

/// Request header plus a mandatory object name
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectNameRequest {
    header: RequestHeader,
    object_name: ObjectName,
}

impl ObjectNameRequest {
    /// Constructor for GET requests
    ///
    /// # Errors
    /// [`RequestError::MissingName`] when `object_name` is `None`,
    /// [`RequestError::MalformedName`] when it does not parse.
    pub fn new(
        request_type: RequestType,
        object_name: Option<&str>,
        path: Vec<String>,
        config: ProcessingConfig,
    ) -> RequestResult<Self> {
        let object_name = ObjectName::from_optional(object_name)?;
        Ok(Self {
            header: RequestHeader::new(request_type, path, config),
            object_name,
        })
    }

    /// Constructor for POST requests, reading the `mbean` key
    ///
    /// # Errors
    /// As [`ObjectNameRequest::new`], plus [`RequestError::MalformedRequest`]
    /// for a non-string `mbean` and the header errors.
    pub fn from_json(map: &Map<String, Value>, config: ProcessingConfig) -> RequestResult<Self> {
        let header = RequestHeader::from_json(map, config)?;
        let object_name = ObjectName::from_optional(mbean_field(map)?)?;
        Ok(Self {
            header,
            object_name,
        })
    }

    /// Request header
    pub fn header(&self) -> &RequestHeader {
        &self.header
    }

    pub(crate) fn header_mut(&mut self) -> &mut RequestHeader {
        &mut self.header
    }

    /// JSON echo with `mbean` in canonical form
    pub fn to_json(&self) -> Map<String, Value> {
        let mut ret = self.header.to_json();
        ret.insert(
            "mbean".to_string(),
            Value::String(self.object_name.canonical()),
        );
        ret
    }

    /// `objectName = <canonical>` followed by the header info
    pub fn info(&self) -> String {
        let mut ret = format!("objectName = {}", self.object_name.canonical());
        if let Some(base) = self.header.info() {
            ret.push_str(", ");
            ret.push_str(&base);
        }
        ret
    }
}

impl HasObjectName for ObjectNameRequest {
    fn object_name(&self) -> &ObjectName {
        &self.object_name
    }

    fn header(&self) -> &RequestHeader {
        &self.header
    }
}

/// Read an optional `mbean` string
pub(crate) fn mbean_field(map: &Map<String, Value>) -> RequestResult<Option<&str>> {
    match map.get("mbean") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(RequestError::malformed("'mbean' must be a string")),
    }
}

/// Parse an optional `mbean` for request types where it may be absent
pub(crate) fn optional_object_name(map: &Map<String, Value>) -> RequestResult<Option<ObjectName>> {
    mbean_field(map)?.map(ObjectName::parse).transpose()
}
