//! Request decoders
//!
//! Turns the two wire encodings into validated [`JmxRequest`]s:
//!
//! - GET: `/<type>/<objectName>/<rest>` with `!` escaping
//! - POST: a JSON object, or a JSON array of objects for a batch

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use super::path::{join_escaped, split_url_path};
use super::processing::{ConfigKey, ProcessingConfig};
use super::request_type::RequestType;
use super::variants::{
    Attributes, ExecRequest, JmxRequest, ListRequest, NotificationRequest, ReadRequest,
    SearchRequest, VersionRequest, WriteRequest,
};
use crate::error::{RequestError, RequestResult};

/// GET literal for a null argument
pub const NULL_ARGUMENT: &str = "[null]";

/// GET literal for an empty string argument
pub const EMPTY_STRING_ARGUMENT: &str = "\"\"";

/// Request types the gateway accepts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestPolicy {
    disabled: HashSet<RequestType>,
}

impl RequestPolicy {
    /// Policy accepting every request type
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Policy rejecting the given types
    pub fn with_disabled(types: impl IntoIterator<Item = RequestType>) -> Self {
        Self {
            disabled: types.into_iter().collect(),
        }
    }

    /// Whether `request_type` is accepted
    pub fn is_enabled(&self, request_type: RequestType) -> bool {
        !self.disabled.contains(&request_type)
    }

    /// # Errors
    /// [`RequestError::UnsupportedType`] when `request_type` is disabled.
    pub fn check(&self, request_type: RequestType) -> RequestResult<()> {
        if self.is_enabled(request_type) {
            Ok(())
        } else {
            Err(RequestError::UnsupportedType(request_type.to_string()))
        }
    }
}

/// A batch element that failed to decode
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Batch element {index}: {error}")]
pub struct BatchFailure {
    /// Position in the batch
    pub index: usize,
    /// Why decoding failed
    #[source]
    pub error: RequestError,
    /// The element as received
    pub request: Value,
}

/// One element of a decoded batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchItem {
    /// Decoded request
    Request(JmxRequest),
    /// Element that failed with `ignoreErrors` set
    Failed(BatchFailure),
}

/// Decoded POST body
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedBody {
    /// A single JSON object
    Single(JmxRequest),
    /// A JSON array
    Batch(Vec<BatchItem>),
}

/// Decodes GET paths and POST bodies
#[derive(Debug, Clone, Default)]
pub struct RequestDecoder {
    policy: RequestPolicy,
}

impl RequestDecoder {
    /// Create a decoder enforcing `policy`
    pub fn new(policy: RequestPolicy) -> Self {
        Self { policy }
    }

    /// Policy in force
    pub fn policy(&self) -> &RequestPolicy {
        &self.policy
    }

    /// Decode a GET path info such as `/read/java.lang:type=Memory/HeapMemoryUsage`
    ///
    /// # Errors
    /// Any [`RequestError`]; escape problems are [`RequestError::Decode`].
    pub fn decode_url(&self, pathinfo: &str, config: &ProcessingConfig) -> RequestResult<JmxRequest> {
        let segments = split_url_path(pathinfo)?;
        self.decode_segments(segments, config)
    }

    /// Decode already lexed URL segments, the first one being the type
    pub fn decode_segments(
        &self,
        segments: Vec<String>,
        config: &ProcessingConfig,
    ) -> RequestResult<JmxRequest> {
        let mut segments = segments.into_iter();
        let tag = segments
            .next()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RequestError::malformed("no request type given"))?;
        let request_type = RequestType::from_tag(&tag)?;
        self.policy.check(request_type)?;

        let rest: Vec<String> = segments.collect();
        let config = config.clone();
        debug!(%request_type, segments = rest.len(), "Decoding GET request");

        let request: JmxRequest = match request_type {
            RequestType::Read => {
                let mut rest = rest.into_iter();
                let name = rest.next();
                let attributes = Attributes::from_segment(rest.next().as_deref());
                ReadRequest::new(name.as_deref(), attributes, rest.collect(), config)?.into()
            }
            RequestType::Write => {
                let mut rest = rest.into_iter();
                let name = rest.next();
                let attribute = rest.next();
                let value = rest
                    .next()
                    .map(|v| write_value_from_segment(&v))
                    .unwrap_or(Value::Null);
                WriteRequest::new(
                    name.as_deref(),
                    attribute.as_deref(),
                    value,
                    rest.collect(),
                    config,
                )?
                .into()
            }
            RequestType::Exec => {
                let mut rest = rest.into_iter();
                let name = rest.next();
                let operation = rest.next();
                let arguments = rest.map(|a| argument_from_segment(&a)).collect();
                ExecRequest::new(name.as_deref(), operation.as_deref(), arguments, config)?.into()
            }
            RequestType::Search => {
                if rest.len() > 1 {
                    return Err(RequestError::malformed(
                        "search request takes at most one pattern",
                    ));
                }
                JmxRequest::Search(SearchRequest::new(
                    rest.first().map(String::as_str),
                    config,
                )?)
            }
            RequestType::List => JmxRequest::List(ListRequest::new(rest, config)),
            RequestType::Version => {
                if !rest.is_empty() {
                    return Err(RequestError::malformed(
                        "version request takes no arguments",
                    ));
                }
                JmxRequest::Version(VersionRequest::new(config))
            }
            RequestType::Notification => {
                let mut rest = rest.into_iter();
                let command = rest.next();
                let client = rest.next();
                let name = rest.next();
                if rest.next().is_some() {
                    return Err(RequestError::malformed(
                        "too many segments for a notification request",
                    ));
                }
                JmxRequest::Notification(NotificationRequest::new(
                    command.as_deref(),
                    client.as_deref(),
                    name.as_deref(),
                    config,
                )?)
            }
        };

        Ok(request)
    }

    /// Decode one JSON request object
    ///
    /// # Errors
    /// [`RequestError::MalformedRequest`] when `value` is not an object, plus
    /// everything the variant constructors report.
    pub fn decode_json(&self, value: &Value, config: &ProcessingConfig) -> RequestResult<JmxRequest> {
        let map = value
            .as_object()
            .ok_or_else(|| RequestError::malformed("request must be a JSON object"))?;
        self.decode_map(map, config)
    }

    /// Decode one JSON request object sent to an URL that carries a path
    ///
    /// # Errors
    /// [`RequestError::ConflictingPath`] when both the URL and the body give
    /// a path.
    pub fn decode_json_with_url_path(
        &self,
        value: &Value,
        url_path: &[String],
        config: &ProcessingConfig,
    ) -> RequestResult<JmxRequest> {
        let mut request = self.decode_json(value, config)?;
        if url_path.is_empty() {
            return Ok(request);
        }
        if let Some(body) = request.header().path_string() {
            return Err(RequestError::ConflictingPath {
                url: join_escaped(url_path).unwrap_or_default(),
                body,
            });
        }
        request.header_mut().replace_path(url_path.to_vec());
        Ok(request)
    }

    fn decode_map(&self, map: &Map<String, Value>, config: &ProcessingConfig) -> RequestResult<JmxRequest> {
        let request_type = match map.get("type") {
            Some(Value::String(tag)) => RequestType::from_tag(tag)?,
            Some(_) => return Err(RequestError::malformed("'type' must be a string")),
            None => return Err(RequestError::malformed("missing 'type'")),
        };
        self.policy.check(request_type)?;

        let config = config.clone();
        let request: JmxRequest = match request_type {
            RequestType::Read => ReadRequest::from_json(map, config)?.into(),
            RequestType::Write => WriteRequest::from_json(map, config)?.into(),
            RequestType::Exec => ExecRequest::from_json(map, config)?.into(),
            RequestType::Search => JmxRequest::Search(SearchRequest::from_json(map, config)?),
            RequestType::List => JmxRequest::List(ListRequest::from_json(map, config)?),
            RequestType::Version => JmxRequest::Version(VersionRequest::from_json(map, config)?),
            RequestType::Notification => {
                JmxRequest::Notification(NotificationRequest::from_json(map, config)?)
            }
        };
        Ok(request)
    }

    /// Decode a JSON array of requests
    ///
    /// With `ignoreErrors` every failing element becomes a
    /// [`BatchItem::Failed`] at its position; without it the first failure
    /// aborts the batch.
    ///
    /// # Errors
    /// The first [`BatchFailure`] when `ignoreErrors` is not set.
    pub fn decode_batch(
        &self,
        items: &[Value],
        url_path: &[String],
        config: &ProcessingConfig,
    ) -> Result<Vec<BatchItem>, BatchFailure> {
        let ignore_errors = config.get_bool(ConfigKey::IgnoreErrors);
        let mut decoded = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            match self.decode_json_with_url_path(item, url_path, config) {
                Ok(request) => decoded.push(BatchItem::Request(request)),
                Err(error) => {
                    let failure = BatchFailure {
                        index,
                        error,
                        request: item.clone(),
                    };
                    if !ignore_errors {
                        return Err(failure);
                    }
                    debug!(index, error = %failure.error, "Skipping undecodable batch element");
                    decoded.push(BatchItem::Failed(failure));
                }
            }
        }

        Ok(decoded)
    }

    /// Decode a raw POST body
    ///
    /// # Errors
    /// [`BodyError::Single`] for invalid JSON, for JSON that is neither an
    /// object nor an array, and for a single request that does not decode.
    /// [`BodyError::Batch`] when a batch element fails without `ignoreErrors`.
    pub fn decode_body(
        &self,
        body: &str,
        url_path: &[String],
        config: &ProcessingConfig,
    ) -> Result<DecodedBody, BodyError> {
        let value: Value = serde_json::from_str(body).map_err(|e| BodyError::Single {
            error: RequestError::Decode(e.to_string()),
            request: None,
        })?;

        match &value {
            Value::Array(items) => Ok(DecodedBody::Batch(
                self.decode_batch(items, url_path, config)?,
            )),
            Value::Object(_) => self
                .decode_json_with_url_path(&value, url_path, config)
                .map(DecodedBody::Single)
                .map_err(|error| BodyError::Single {
                    error,
                    request: Some(value.clone()),
                }),
            _ => Err(BodyError::Single {
                error: RequestError::malformed("request body must be a JSON object or array"),
                request: Some(value.clone()),
            }),
        }
    }
}

/// Failure to decode a POST body
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BodyError {
    /// The body as a whole is not a valid request
    #[error("{error}")]
    Single {
        error: RequestError,
        /// The body, if it was valid JSON
        request: Option<Value>,
    },

    /// A batch aborted on its first failing element
    #[error(transparent)]
    Batch(#[from] BatchFailure),
}

impl BodyError {
    /// Underlying decoding error
    pub fn error(&self) -> &RequestError {
        match self {
            BodyError::Single { error, .. } => error,
            BodyError::Batch(failure) => &failure.error,
        }
    }

    /// Position of the failing batch element
    pub fn index(&self) -> Option<usize> {
        match self {
            BodyError::Single { .. } => None,
            BodyError::Batch(failure) => Some(failure.index),
        }
    }

    /// Offending request JSON, if any
    pub fn request(&self) -> Option<&Value> {
        match self {
            BodyError::Single { request, .. } => request.as_ref(),
            BodyError::Batch(failure) => Some(&failure.request),
        }
    }
}

fn integer_literal() -> &'static Regex {
    static INTEGER_RE: OnceLock<Regex> = OnceLock::new();
    INTEGER_RE.get_or_init(|| Regex::new(r"^-?(0|[1-9][0-9]{0,17})$").expect("invalid integer regex"))
}

/// Typed value of a GET operation argument
///
/// `[null]` is null, `true`/`false` are booleans, plain integers are
/// numbers, `""` is the empty string; anything else stays a string.
pub fn argument_from_segment(segment: &str) -> Value {
    match segment {
        NULL_ARGUMENT => Value::Null,
        EMPTY_STRING_ARGUMENT => Value::String(String::new()),
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        s if integer_literal().is_match(s) => s
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(s.to_string())),
        s => Value::String(s.to_string()),
    }
}

/// Value of a GET write request; only the null and empty literals are special
pub fn write_value_from_segment(segment: &str) -> Value {
    match segment {
        NULL_ARGUMENT => Value::Null,
        EMPTY_STRING_ARGUMENT => Value::String(String::new()),
        s => Value::String(s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn decoder() -> RequestDecoder {
        RequestDecoder::default()
    }

    #[test]
    fn test_argument_typing() {
        assert_eq!(argument_from_segment("true"), json!(true));
        assert_eq!(argument_from_segment("false"), json!(false));
        assert_eq!(argument_from_segment("[null]"), Value::Null);
        assert_eq!(argument_from_segment("42"), json!(42));
        assert_eq!(argument_from_segment("-7"), json!(-7));
        assert_eq!(argument_from_segment("007"), json!("007"));
        assert_eq!(argument_from_segment("1.5"), json!("1.5"));
        assert_eq!(argument_from_segment("\"\""), json!(""));
        assert_eq!(argument_from_segment("TRUE"), json!("TRUE"));
    }

    #[test]
    fn test_write_value_stays_string() {
        assert_eq!(write_value_from_segment("10"), json!("10"));
        assert_eq!(write_value_from_segment("[null]"), Value::Null);
    }

    #[test]
    fn test_decode_read_url() {
        let request = decoder()
            .decode_url(
                "/read/java.lang:type=Memory/HeapMemoryUsage/used",
                &ProcessingConfig::new(),
            )
            .unwrap();
        let JmxRequest::Read(read) = &request else {
            panic!("expected read request");
        };
        assert_eq!(read.attributes(), &Attributes::Single("HeapMemoryUsage".into()));
        assert_eq!(request.path_parts(), &["used".to_string()]);
    }

    #[test]
    fn test_decode_write_url() {
        let request = decoder()
            .decode_url("/write/d:k=v/Level/FINE/a!/b", &ProcessingConfig::new())
            .unwrap();
        let JmxRequest::Write(write) = &request else {
            panic!("expected write request");
        };
        assert_eq!(write.attribute(), "Level");
        assert_eq!(write.value(), &json!("FINE"));
        assert_eq!(request.path_parts(), &["a/b".to_string()]);

        let request = decoder()
            .decode_url("/write/d:k=v/Level/-", &ProcessingConfig::new())
            .unwrap();
        let JmxRequest::Write(write) = &request else {
            panic!("expected write request");
        };
        assert_eq!(write.value(), &Value::Null);
    }

    #[test]
    fn test_decode_exec_url_with_typed_arguments() {
        let request = decoder()
            .decode_url(
                "/exec/java.lang:type=Threading/dumpAllThreads/true/true",
                &ProcessingConfig::new(),
            )
            .unwrap();
        let JmxRequest::Exec(exec) = &request else {
            panic!("expected exec request");
        };
        assert_eq!(exec.operation(), "dumpAllThreads");
        assert_eq!(exec.arguments(), &[json!(true), json!(true)]);
    }

    #[test]
    fn test_decode_other_urls() {
        let config = ProcessingConfig::new();
        assert!(matches!(
            decoder().decode_url("/version", &config).unwrap(),
            JmxRequest::Version(_)
        ));
        assert!(matches!(
            decoder().decode_url("/search/*:type=Memory", &config).unwrap(),
            JmxRequest::Search(_)
        ));
        let list = decoder().decode_url("/list/java.lang/type=Memory", &config).unwrap();
        assert_eq!(list.path_parts(), &["java.lang".to_string(), "type=Memory".to_string()]);
        assert!(matches!(
            decoder().decode_url("/notification/register", &config).unwrap(),
            JmxRequest::Notification(_)
        ));
    }

    #[test]
    fn test_decode_url_errors() {
        let config = ProcessingConfig::new();
        let kind = |p: &str| decoder().decode_url(p, &config).unwrap_err().kind();
        assert_eq!(kind("/"), ErrorKind::MalformedRequest);
        assert_eq!(kind("/delete/d:k=v"), ErrorKind::MalformedRequest);
        assert_eq!(kind("/read"), ErrorKind::MissingName);
        assert_eq!(kind("/read/no-colon-here"), ErrorKind::MalformedName);
        assert_eq!(kind("/read/d:k=v!x"), ErrorKind::DecodeError);
        assert_eq!(kind("/exec/d:k=v"), ErrorKind::MalformedRequest);
        assert_eq!(kind("/version/extra"), ErrorKind::MalformedRequest);
    }

    #[test]
    fn test_type_tag_is_case_insensitive() {
        let request = decoder()
            .decode_json(&json!({"type": "READ", "mbean": "d:k=v"}), &ProcessingConfig::new())
            .unwrap();
        assert_eq!(request.request_type(), RequestType::Read);
        assert_eq!(request.to_json()["type"], json!("read"));
    }

    #[test]
    fn test_policy_rejects_disabled_types() {
        let decoder = RequestDecoder::new(RequestPolicy::with_disabled([RequestType::Exec]));
        let err = decoder
            .decode_url("/exec/d:k=v/gc", &ProcessingConfig::new())
            .unwrap_err();
        assert_eq!(err, RequestError::UnsupportedType("exec".into()));
        assert!(decoder
            .decode_json(&json!({"type": "read", "mbean": "d:k=v"}), &ProcessingConfig::new())
            .is_ok());
    }

    #[test]
    fn test_conflicting_path() {
        let url_path = vec!["used".to_string()];
        let config = ProcessingConfig::new();
        let err = decoder()
            .decode_json_with_url_path(
                &json!({"type": "read", "mbean": "d:k=v", "attribute": "A", "path": "max"}),
                &url_path,
                &config,
            )
            .unwrap_err();
        assert!(matches!(err, RequestError::ConflictingPath { .. }));
        assert_eq!(err.kind(), ErrorKind::MalformedRequest);

        let request = decoder()
            .decode_json_with_url_path(
                &json!({"type": "read", "mbean": "d:k=v", "attribute": "A"}),
                &url_path,
                &config,
            )
            .unwrap();
        assert_eq!(request.path_parts(), url_path.as_slice());
    }

    #[test]
    fn test_decode_json_not_an_object() {
        let err = decoder()
            .decode_json(&json!("read"), &ProcessingConfig::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRequest);
    }

    #[test]
    fn test_batch_without_ignore_errors_aborts() {
        let items = vec![json!({"type": "version"}), json!({"type": "read"})];
        let failure = decoder()
            .decode_batch(&items, &[], &ProcessingConfig::new())
            .unwrap_err();
        assert_eq!(failure.index, 1);
        assert_eq!(failure.error, RequestError::MissingName);
        assert_eq!(failure.request, items[1]);
    }

    #[test]
    fn test_batch_with_ignore_errors_keeps_positions() {
        let config = ProcessingConfig::new().with(ConfigKey::IgnoreErrors, "true");
        let items = vec![
            json!({"type": "read"}),
            json!({"type": "version"}),
            json!(17),
            json!({"type": "read", "mbean": "java.lang:type=Memory"}),
        ];
        let decoded = decoder().decode_batch(&items, &[], &config).unwrap();
        assert_eq!(decoded.len(), 4);
        let failed: Vec<usize> = decoded
            .iter()
            .filter_map(|item| match item {
                BatchItem::Failed(f) => Some(f.index),
                BatchItem::Request(_) => None,
            })
            .collect();
        assert_eq!(failed, vec![0, 2]);
    }

    #[test]
    fn test_decode_body() {
        let config = ProcessingConfig::new();
        assert!(matches!(
            decoder().decode_body(r#"{"type":"version"}"#, &[], &config).unwrap(),
            DecodedBody::Single(_)
        ));
        assert!(matches!(
            decoder().decode_body(r#"[{"type":"version"}]"#, &[], &config).unwrap(),
            DecodedBody::Batch(items) if items.len() == 1
        ));
        let err = decoder().decode_body("{not json", &[], &config).unwrap_err();
        assert_eq!(err.error().kind(), ErrorKind::DecodeError);
        assert!(err.request().is_none());
        let err = decoder().decode_body("42", &[], &config).unwrap_err();
        assert_eq!(err.error().kind(), ErrorKind::MalformedRequest);
        assert_eq!(err.index(), None);
        let err = decoder()
            .decode_body(r#"[{"type":"version"},{"type":"read"}]"#, &[], &config)
            .unwrap_err();
        assert_eq!(err.index(), Some(1));
        assert_eq!(err.error(), &RequestError::MissingName);
    }
}
