//! Error types for jolokia-gateway
//!
//! This module defines the error types used throughout the application.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Kind of a request decoding failure
///
/// The kind name is what clients see as `error_type` in an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Required object name field absent
    MissingName,
    /// Object name string violates the grammar
    MalformedName,
    /// Not a JSON object, unknown type, conflicting fields or wrong value shape
    MalformedRequest,
    /// Request type disabled by policy
    UnsupportedType,
    /// Invalid URL escape sequence or malformed JSON
    DecodeError,
}

impl ErrorKind {
    /// Name reported in the `error_type` field
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingName => "MissingName",
            ErrorKind::MalformedName => "MalformedName",
            ErrorKind::MalformedRequest => "MalformedRequest",
            ErrorKind::UnsupportedType => "UnsupportedType",
            ErrorKind::DecodeError => "DecodeError",
        }
    }

    /// HTTP status used when this kind of failure is reported
    pub fn status(&self) -> u16 {
        match self {
            ErrorKind::UnsupportedType => 403,
            _ => 400,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request decoding and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Object name absent where one is required
    #[error("Object name can not be null")]
    MissingName,

    /// Object name does not parse
    #[error("Invalid object name '{name}': {reason}")]
    MalformedName { name: String, reason: String },

    /// Structurally invalid request
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Path supplied by the request URL and by the request body
    #[error("Conflicting path: '{url}' given in the URL and '{body}' in the request body")]
    ConflictingPath { url: String, body: String },

    /// Request type switched off in the gateway policy
    #[error("Request type '{0}' is not supported by this gateway")]
    UnsupportedType(String),

    /// Wire-level decoding failure
    #[error("Cannot decode request: {0}")]
    Decode(String),
}

impl RequestError {
    pub(crate) fn malformed_name(name: &str, reason: impl Into<String>) -> Self {
        RequestError::MalformedName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        RequestError::MalformedRequest(message.into())
    }

    /// Error taxonomy kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            RequestError::MissingName => ErrorKind::MissingName,
            RequestError::MalformedName { .. } => ErrorKind::MalformedName,
            RequestError::MalformedRequest(_) | RequestError::ConflictingPath { .. } => {
                ErrorKind::MalformedRequest
            }
            RequestError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            RequestError::Decode(_) => ErrorKind::DecodeError,
        }
    }

    /// HTTP status for this error
    pub fn status(&self) -> u16 {
        self.kind().status()
    }
}

/// 업스트림 Jolokia 에이전트 호출 에러
#[derive(Error, Debug)]
pub enum DispatchError {
    /// HTTP 클라이언트 초기화 실패
    #[error("Failed to initialize HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),

    /// HTTP 요청 실패
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[source] reqwest::Error),

    /// HTTP 응답 읽기 실패
    #[error("Failed to read HTTP response: {0}")]
    HttpResponse(#[source] reqwest::Error),

    /// HTTP 상태 코드 에러
    #[error("HTTP error status: {0}")]
    HttpStatus(u16),

    /// JSON 파싱 에러
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// 에이전트가 돌려준 에러 응답 (예: 404 InstanceNotFoundException)
    #[error("{error}")]
    Remote {
        status: u16,
        error: String,
        error_type: Option<String>,
    },

    /// 타임아웃
    /// The value is the configured timeout in milliseconds, if known.
    #[error("Request timed out{}", .0.map(|ms| format!(" after {}ms", ms)).unwrap_or_default())]
    Timeout(Option<u64>),

    /// 연결 실패
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// 최대 재시도 초과
    #[error("Maximum retries exceeded")]
    MaxRetriesExceeded,

    /// 인증 실패
    #[error("Authentication with the upstream agent failed")]
    AuthenticationFailed,
}

impl DispatchError {
    /// 재시도 가능한 에러인지 확인
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DispatchError::HttpRequest(_)
                | DispatchError::HttpResponse(_)
                | DispatchError::Timeout(..)
                | DispatchError::ConnectionFailed(_)
                | DispatchError::HttpStatus(500..=599)
        )
    }

    /// Status reported to the caller
    ///
    /// Remote errors keep the agent's status (404 for an unknown MBean),
    /// transport failures map to gateway statuses.
    pub fn http_status(&self) -> u16 {
        match self {
            DispatchError::Remote { status, .. } => *status,
            DispatchError::AuthenticationFailed => 401,
            DispatchError::Timeout(_) => 504,
            _ => 502,
        }
    }

    /// Value reported in the `error_type` field
    pub fn error_type(&self) -> String {
        match self {
            DispatchError::Remote {
                error_type: Some(t),
                ..
            } => t.clone(),
            DispatchError::Remote { .. } => "RemoteError".to_string(),
            DispatchError::AuthenticationFailed => "AuthenticationFailed".to_string(),
            DispatchError::Timeout(_) => "Timeout".to_string(),
            _ => "UpstreamError".to_string(),
        }
    }

    /// Create a Timeout error with known duration
    pub fn timeout_with_duration(ms: u64) -> Self {
        DispatchError::Timeout(Some(ms))
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not expose the configured timeout here.
            DispatchError::Timeout(None)
        } else if err.is_connect() {
            DispatchError::ConnectionFailed(err.to_string())
        } else if err.is_request() {
            DispatchError::HttpRequest(err)
        } else {
            DispatchError::HttpResponse(err)
        }
    }
}

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Request decoding error
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Upstream dispatch error
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::Config(e) => (500, "ConfigError".to_string(), e.to_string()),
            AppError::Request(e) => (e.status(), e.kind().to_string(), e.to_string()),
            AppError::Dispatch(e) => (e.http_status(), e.error_type(), e.to_string()),
            AppError::Internal(e) => (500, "InternalError".to_string(), e.clone()),
        };

        tracing::error!(status, error = %message, "Request failed");

        let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = json!({
            "status": status,
            "error": message,
            "error_type": error_type,
        });
        (code, Json(body)).into_response()
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for request decoding
pub type RequestResult<T> = Result<T, RequestError>;
