//! Request type tags

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{RequestError, RequestResult};

/// JMX request type
///
/// The tag decides which attributes, besides the object name, a request
/// carries. Tags compare case-insensitively on the wire and are stored in
/// lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequestType {
    /// Read one, several or all attributes
    Read,
    /// Write a single attribute
    Write,
    /// Execute an operation
    Exec,
    /// Search MBean names matching a pattern
    Search,
    /// List MBean metadata
    List,
    /// Agent version
    Version,
    /// Notification client management
    Notification,
}

impl RequestType {
    /// All request types
    pub const ALL: [RequestType; 7] = [
        RequestType::Read,
        RequestType::Write,
        RequestType::Exec,
        RequestType::Search,
        RequestType::List,
        RequestType::Version,
        RequestType::Notification,
    ];

    /// Wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Read => "read",
            RequestType::Write => "write",
            RequestType::Exec => "exec",
            RequestType::Search => "search",
            RequestType::List => "list",
            RequestType::Version => "version",
            RequestType::Notification => "notification",
        }
    }

    /// Parse a wire tag, ignoring case
    ///
    /// # Errors
    /// [`RequestError::MalformedRequest`] for an unknown tag.
    pub fn from_tag(tag: &str) -> RequestResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| RequestError::malformed(format!("Unknown request type '{}'", tag)))
    }

    /// JSON keys this type reads besides `type`, `path` and `target`
    pub fn payload_keys(&self) -> &'static [&'static str] {
        match self {
            RequestType::Read => &["mbean", "attribute"],
            RequestType::Write => &["mbean", "attribute", "value"],
            RequestType::Exec => &["mbean", "operation", "arguments"],
            RequestType::Search | RequestType::List => &["mbean"],
            RequestType::Version => &[],
            RequestType::Notification => &["mbean", "command", "client"],
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestType {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
    }
}

impl Serialize for RequestType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RequestType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RequestType::from_tag(&s).map_err(|_| {
            serde::de::Error::custom(format!(
                "unknown request type '{}', expected one of: read, write, exec, search, list, version, notification",
                s
            ))
        })
    }
}
