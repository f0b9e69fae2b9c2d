//! Concrete request types
//!
//! Each request type is its own struct; [`JmxRequest`] is the tagged union
//! the decoders produce and the dispatcher consumes.

use std::fmt;

use serde_json::{Map, Value};

use super::base::{optional_object_name, HasObjectName, ObjectNameRequest, RequestHeader};
use super::object_name::ObjectName;
use super::processing::ProcessingConfig;
use super::request_type::RequestType;
use crate::error::{RequestError, RequestResult};

/// Attribute selection of a read request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Attributes {
    /// All attributes
    #[default]
    All,
    /// One attribute
    Single(String),
    /// Several attributes
    Multiple(Vec<String>),
}

impl Attributes {
    /// Interpret the `attribute` field of a JSON request
    ///
    /// An empty array selects all attributes.
    pub fn from_json(value: Option<&Value>) -> RequestResult<Self> {
        match value {
            None | Some(Value::Null) => Ok(Attributes::All),
            Some(Value::String(s)) => Ok(Attributes::Single(s.clone())),
            Some(Value::Array(items)) if items.is_empty() => Ok(Attributes::All),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        RequestError::malformed("'attribute' array must contain only strings")
                    })
                })
                .collect::<RequestResult<Vec<_>>>()
                .map(Attributes::Multiple),
            Some(_) => Err(RequestError::malformed(
                "'attribute' must be a string or an array of strings",
            )),
        }
    }

    /// Interpret an attribute URL segment; `a,b` names several attributes
    pub fn from_segment(segment: Option<&str>) -> Self {
        match segment {
            None | Some("") => Attributes::All,
            Some(s) if s.contains(',') => {
                Attributes::Multiple(s.split(',').map(str::to_string).collect())
            }
            Some(s) => Attributes::Single(s.to_string()),
        }
    }

    /// JSON form, `None` for all attributes
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Attributes::All => None,
            Attributes::Single(s) => Some(Value::String(s.clone())),
            Attributes::Multiple(v) => Some(Value::Array(
                v.iter().cloned().map(Value::String).collect(),
            )),
        }
    }

    /// Attribute names
    pub fn names(&self) -> Vec<&str> {
        match self {
            Attributes::All => Vec::new(),
            Attributes::Single(s) => vec![s.as_str()],
            Attributes::Multiple(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

/// Read attribute request
#[derive(Debug, Clone, PartialEq)]
pub struct ReadRequest {
    inner: ObjectNameRequest,
    attributes: Attributes,
}

impl ReadRequest {
    /// GET constructor
    pub fn new(
        object_name: Option<&str>,
        attributes: Attributes,
        path: Vec<String>,
        config: ProcessingConfig,
    ) -> RequestResult<Self> {
        Ok(Self {
            inner: ObjectNameRequest::new(RequestType::Read, object_name, path, config)?,
            attributes,
        })
    }

    /// POST constructor
    pub fn from_json(map: &Map<String, Value>, config: ProcessingConfig) -> RequestResult<Self> {
        Ok(Self {
            inner: ObjectNameRequest::from_json(map, config)?,
            attributes: Attributes::from_json(map.get("attribute"))?,
        })
    }

    /// Attribute selection
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// JSON echo
    pub fn to_json(&self) -> Map<String, Value> {
        let mut ret = self.inner.to_json();
        if let Some(attribute) = self.attributes.to_json() {
            ret.insert("attribute".to_string(), attribute);
        }
        ret
    }

    /// Diagnostic string
    pub fn info(&self) -> String {
        match &self.attributes {
            Attributes::All => self.inner.info(),
            attrs => format!("attribute = {}, {}", attrs.names().join(","), self.inner.info()),
        }
    }
}

/// Write attribute request
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    inner: ObjectNameRequest,
    attribute: String,
    value: Value,
}

impl WriteRequest {
    /// GET constructor
    pub fn new(
        object_name: Option<&str>,
        attribute: Option<&str>,
        value: Value,
        path: Vec<String>,
        config: ProcessingConfig,
    ) -> RequestResult<Self> {
        let inner = ObjectNameRequest::new(RequestType::Write, object_name, path, config)?;
        let attribute = attribute
            .filter(|a| !a.is_empty())
            .ok_or_else(|| RequestError::malformed("write request requires an attribute"))?;
        Ok(Self {
            inner,
            attribute: attribute.to_string(),
            value,
        })
    }

    /// POST constructor; a missing `value` writes null
    pub fn from_json(map: &Map<String, Value>, config: ProcessingConfig) -> RequestResult<Self> {
        let inner = ObjectNameRequest::from_json(map, config)?;
        let attribute = match map.get("attribute") {
            Some(Value::String(a)) if !a.is_empty() => a.clone(),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(RequestError::malformed("write request requires an attribute"))
            }
            Some(_) => return Err(RequestError::malformed("'attribute' must be a string")),
        };
        Ok(Self {
            inner,
            attribute,
            value: map.get("value").cloned().unwrap_or(Value::Null),
        })
    }

    /// Attribute to write
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// New value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// JSON echo
    pub fn to_json(&self) -> Map<String, Value> {
        let mut ret = self.inner.to_json();
        ret.insert(
            "attribute".to_string(),
            Value::String(self.attribute.clone()),
        );
        ret.insert("value".to_string(), self.value.clone());
        ret
    }

    /// Diagnostic string
    pub fn info(&self) -> String {
        format!(
            "attribute = {}, value = {}, {}",
            self.attribute,
            self.value,
            self.inner.info()
        )
    }
}

/// Execute operation request
#[derive(Debug, Clone, PartialEq)]
pub struct ExecRequest {
    inner: ObjectNameRequest,
    operation: String,
    arguments: Vec<Value>,
}

impl ExecRequest {
    /// GET constructor
    pub fn new(
        object_name: Option<&str>,
        operation: Option<&str>,
        arguments: Vec<Value>,
        config: ProcessingConfig,
    ) -> RequestResult<Self> {
        let inner = ObjectNameRequest::new(RequestType::Exec, object_name, Vec::new(), config)?;
        let operation = operation
            .filter(|o| !o.is_empty())
            .ok_or_else(|| RequestError::malformed("exec request requires an operation"))?;
        Ok(Self {
            inner,
            operation: operation.to_string(),
            arguments,
        })
    }

    /// POST constructor; arguments keep their JSON types
    pub fn from_json(map: &Map<String, Value>, config: ProcessingConfig) -> RequestResult<Self> {
        let inner = ObjectNameRequest::from_json(map, config)?;
        let operation = match map.get("operation") {
            Some(Value::String(o)) if !o.is_empty() => o.clone(),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(RequestError::malformed("exec request requires an operation"))
            }
            Some(_) => return Err(RequestError::malformed("'operation' must be a string")),
        };
        let arguments = match map.get("arguments") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(args)) => args.clone(),
            Some(_) => return Err(RequestError::malformed("'arguments' must be an array")),
        };
        Ok(Self {
            inner,
            operation,
            arguments,
        })
    }

    /// Operation name, possibly with a signature like `op(int,java.lang.String)`
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Operation arguments
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// JSON echo
    pub fn to_json(&self) -> Map<String, Value> {
        let mut ret = self.inner.to_json();
        ret.insert(
            "operation".to_string(),
            Value::String(self.operation.clone()),
        );
        ret.insert(
            "arguments".to_string(),
            Value::Array(self.arguments.clone()),
        );
        ret
    }

    /// Diagnostic string
    pub fn info(&self) -> String {
        let mut ret = format!("operation = {}", self.operation);
        if !self.arguments.is_empty() {
            ret.push_str(&format!(", arguments = {}", Value::Array(self.arguments.clone())));
        }
        ret.push_str(", ");
        ret.push_str(&self.inner.info());
        ret
    }
}

/// Search request; without a pattern every MBean matches
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    header: RequestHeader,
    pattern: Option<ObjectName>,
}

impl SearchRequest {
    /// GET constructor
    pub fn new(pattern: Option<&str>, config: ProcessingConfig) -> RequestResult<Self> {
        Ok(Self {
            header: RequestHeader::new(RequestType::Search, Vec::new(), config),
            pattern: pattern.map(ObjectName::parse).transpose()?,
        })
    }

    /// POST constructor
    pub fn from_json(map: &Map<String, Value>, config: ProcessingConfig) -> RequestResult<Self> {
        Ok(Self {
            header: RequestHeader::from_json(map, config)?,
            pattern: optional_object_name(map)?,
        })
    }

    /// Search pattern
    pub fn pattern(&self) -> Option<&ObjectName> {
        self.pattern.as_ref()
    }

    /// JSON echo
    pub fn to_json(&self) -> Map<String, Value> {
        with_optional_name(self.header.to_json(), self.pattern.as_ref())
    }

    /// Diagnostic string
    pub fn info(&self) -> String {
        optional_name_info(&self.header, self.pattern.as_ref())
    }
}

/// List request
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    header: RequestHeader,
    object_name: Option<ObjectName>,
}

impl ListRequest {
    /// GET constructor
    pub fn new(path: Vec<String>, config: ProcessingConfig) -> Self {
        Self {
            header: RequestHeader::new(RequestType::List, path, config),
            object_name: None,
        }
    }

    /// POST constructor
    pub fn from_json(map: &Map<String, Value>, config: ProcessingConfig) -> RequestResult<Self> {
        Ok(Self {
            header: RequestHeader::from_json(map, config)?,
            object_name: optional_object_name(map)?,
        })
    }

    /// MBean the listing is restricted to
    pub fn object_name(&self) -> Option<&ObjectName> {
        self.object_name.as_ref()
    }

    /// JSON echo
    pub fn to_json(&self) -> Map<String, Value> {
        with_optional_name(self.header.to_json(), self.object_name.as_ref())
    }

    /// Diagnostic string
    pub fn info(&self) -> String {
        optional_name_info(&self.header, self.object_name.as_ref())
    }
}

/// Version request
#[derive(Debug, Clone, PartialEq)]
pub struct VersionRequest {
    header: RequestHeader,
}

impl VersionRequest {
    /// GET constructor
    pub fn new(config: ProcessingConfig) -> Self {
        Self {
            header: RequestHeader::new(RequestType::Version, Vec::new(), config),
        }
    }

    /// POST constructor
    pub fn from_json(map: &Map<String, Value>, config: ProcessingConfig) -> RequestResult<Self> {
        Ok(Self {
            header: RequestHeader::from_json(map, config)?,
        })
    }

    /// JSON echo
    pub fn to_json(&self) -> Map<String, Value> {
        self.header.to_json()
    }

    /// Diagnostic string
    pub fn info(&self) -> String {
        self.header.info().unwrap_or_default()
    }
}

/// Notification command that needs an MBean
const ADD_COMMAND: &str = "add";

/// Notification request
///
/// Only the envelope is modeled: the command, the client handle and the
/// MBean for `add`. Listener management itself belongs to the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    header: RequestHeader,
    command: String,
    client: Option<String>,
    object_name: Option<ObjectName>,
}

impl NotificationRequest {
    /// GET constructor
    pub fn new(
        command: Option<&str>,
        client: Option<&str>,
        object_name: Option<&str>,
        config: ProcessingConfig,
    ) -> RequestResult<Self> {
        let command = command
            .filter(|c| !c.is_empty())
            .ok_or_else(|| RequestError::malformed("notification request requires a command"))?
            .to_lowercase();
        let object_name = Self::object_name_for(&command, object_name)?;
        Ok(Self {
            header: RequestHeader::new(RequestType::Notification, Vec::new(), config),
            command,
            client: client.map(str::to_string),
            object_name,
        })
    }

    /// POST constructor
    pub fn from_json(map: &Map<String, Value>, config: ProcessingConfig) -> RequestResult<Self> {
        let header = RequestHeader::from_json(map, config)?;
        let command = match map.get("command") {
            Some(Value::String(c)) if !c.is_empty() => c.to_lowercase(),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(RequestError::malformed(
                    "notification request requires a command",
                ))
            }
            Some(_) => return Err(RequestError::malformed("'command' must be a string")),
        };
        let client = match map.get("client") {
            None | Some(Value::Null) => None,
            Some(Value::String(c)) => Some(c.clone()),
            Some(_) => return Err(RequestError::malformed("'client' must be a string")),
        };
        let object_name = Self::object_name_for(&command, super::base::mbean_field(map)?)?;
        Ok(Self {
            header,
            command,
            client,
            object_name,
        })
    }

    fn object_name_for(command: &str, name: Option<&str>) -> RequestResult<Option<ObjectName>> {
        if command == ADD_COMMAND {
            ObjectName::from_optional(name).map(Some)
        } else {
            name.map(ObjectName::parse).transpose()
        }
    }

    /// Command (`register`, `unregister`, `add`, `remove`, `ping`, ...)
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Client handle
    pub fn client(&self) -> Option<&str> {
        self.client.as_deref()
    }

    /// MBean to listen on
    pub fn object_name(&self) -> Option<&ObjectName> {
        self.object_name.as_ref()
    }

    /// JSON echo
    pub fn to_json(&self) -> Map<String, Value> {
        let mut ret = with_optional_name(self.header.to_json(), self.object_name.as_ref());
        ret.insert("command".to_string(), Value::String(self.command.clone()));
        if let Some(client) = &self.client {
            ret.insert("client".to_string(), Value::String(client.clone()));
        }
        ret
    }

    /// Diagnostic string
    pub fn info(&self) -> String {
        let mut ret = format!("command = {}", self.command);
        if let Some(client) = &self.client {
            ret.push_str(&format!(", client = {}", client));
        }
        let tail = optional_name_info(&self.header, self.object_name.as_ref());
        if !tail.is_empty() {
            ret.push_str(", ");
            ret.push_str(&tail);
        }
        ret
    }
}

fn with_optional_name(mut json: Map<String, Value>, name: Option<&ObjectName>) -> Map<String, Value> {
    if let Some(name) = name {
        json.insert("mbean".to_string(), Value::String(name.canonical()));
    }
    json
}

fn optional_name_info(header: &RequestHeader, name: Option<&ObjectName>) -> String {
    let parts: Vec<String> = name
        .map(|n| format!("objectName = {}", n.canonical()))
        .into_iter()
        .chain(header.info())
        .collect();
    parts.join(", ")
}

/// A decoded, validated JMX request
#[derive(Debug, Clone, PartialEq)]
pub enum JmxRequest {
    /// Read attributes
    Read(ReadRequest),
    /// Write an attribute
    Write(WriteRequest),
    /// Execute an operation
    Exec(ExecRequest),
    /// Search names
    Search(SearchRequest),
    /// List metadata
    List(ListRequest),
    /// Agent version
    Version(VersionRequest),
    /// Notification command
    Notification(NotificationRequest),
}

impl JmxRequest {
    /// Shared attributes
    pub fn header(&self) -> &RequestHeader {
        match self {
            JmxRequest::Read(r) => r.inner.header(),
            JmxRequest::Write(r) => r.inner.header(),
            JmxRequest::Exec(r) => r.inner.header(),
            JmxRequest::Search(r) => &r.header,
            JmxRequest::List(r) => &r.header,
            JmxRequest::Version(r) => &r.header,
            JmxRequest::Notification(r) => &r.header,
        }
    }

    pub(crate) fn header_mut(&mut self) -> &mut RequestHeader {
        match self {
            JmxRequest::Read(r) => r.inner.header_mut(),
            JmxRequest::Write(r) => r.inner.header_mut(),
            JmxRequest::Exec(r) => r.inner.header_mut(),
            JmxRequest::Search(r) => &mut r.header,
            JmxRequest::List(r) => &mut r.header,
            JmxRequest::Version(r) => &mut r.header,
            JmxRequest::Notification(r) => &mut r.header,
        }
    }

    /// Request type
    pub fn request_type(&self) -> RequestType {
        self.header().request_type()
    }

    /// Path segments
    pub fn path_parts(&self) -> &[String] {
        self.header().path_parts()
    }

    /// Processing configuration
    pub fn processing_config(&self) -> &ProcessingConfig {
        self.header().processing_config()
    }

    /// The name-bearing part, for request types that require an object name
    pub fn as_object_name_request(&self) -> Option<&dyn HasObjectName> {
        match self {
            JmxRequest::Read(r) => Some(&r.inner),
            JmxRequest::Write(r) => Some(&r.inner),
            JmxRequest::Exec(r) => Some(&r.inner),
            _ => None,
        }
    }

    /// Object name, if the request carries one
    pub fn object_name(&self) -> Option<&ObjectName> {
        match self {
            JmxRequest::Read(r) => Some(r.inner.object_name()),
            JmxRequest::Write(r) => Some(r.inner.object_name()),
            JmxRequest::Exec(r) => Some(r.inner.object_name()),
            JmxRequest::Search(r) => r.pattern(),
            JmxRequest::List(r) => r.object_name(),
            JmxRequest::Version(_) => None,
            JmxRequest::Notification(r) => r.object_name(),
        }
    }

    /// Render `name` following the `objectNameKeyOrder` option
    pub fn ordered_object_name(&self, name: &ObjectName) -> String {
        self.header().ordered_object_name(name)
    }

    /// JSON echo of the request
    pub fn to_json(&self) -> Value {
        let map = match self {
            JmxRequest::Read(r) => r.to_json(),
            JmxRequest::Write(r) => r.to_json(),
            JmxRequest::Exec(r) => r.to_json(),
            JmxRequest::Search(r) => r.to_json(),
            JmxRequest::List(r) => r.to_json(),
            JmxRequest::Version(r) => r.to_json(),
            JmxRequest::Notification(r) => r.to_json(),
        };
        Value::Object(map)
    }

    /// Short diagnostic string
    pub fn info(&self) -> String {
        match self {
            JmxRequest::Read(r) => r.info(),
            JmxRequest::Write(r) => r.info(),
            JmxRequest::Exec(r) => r.info(),
            JmxRequest::Search(r) => r.info(),
            JmxRequest::List(r) => r.info(),
            JmxRequest::Version(r) => r.info(),
            JmxRequest::Notification(r) => r.info(),
        }
    }
}

impl fmt::Display for JmxRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JmxRequest[type = {}", self.request_type())?;
        let info = self.info();
        if !info.is_empty() {
            write!(f, ", {}", info)?;
        }
        f.write_str("]")
    }
}

impl From<ReadRequest> for JmxRequest {
    fn from(r: ReadRequest) -> Self {
        JmxRequest::Read(r)
    }
}

impl From<WriteRequest> for JmxRequest {
    fn from(r: WriteRequest) -> Self {
        JmxRequest::Write(r)
    }
}

impl From<ExecRequest> for JmxRequest {
    fn from(r: ExecRequest) -> Self {
        JmxRequest::Exec(r)
    }
}
