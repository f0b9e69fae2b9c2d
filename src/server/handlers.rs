//! HTTP request handlers
//!
//! GET requests carry the request in the URL path, POST requests in the
//! body. Both are decoded, validated and then dispatched upstream; every
//! outcome is reported as a Jolokia response envelope.

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::AppState;
use crate::error::{AppResult, RequestError};
use crate::request::path::split_url_path;
use crate::request::{BatchItem, ConfigKey, DecodedBody, JmxRequest, ProcessingConfig};
use crate::response::ResponseEnvelope;
use crate::upstream::version_value;

/// Query parameter carrying the path info for clients that cannot put it in the URL
const PATH_QUERY_PARAM: &str = "p";

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Health status
    status: String,
    /// Application version
    version: String,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET on the context path itself
pub async fn get_root(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    handle_get(state, None, query).await
}

/// GET with a path info
pub async fn get_path(
    State(state): State<AppState>,
    Path(pathinfo): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    handle_get(state, Some(pathinfo), query).await
}

/// POST on the context path itself
pub async fn post_root(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> AppResult<Response> {
    Ok(handle_post(state, None, query, utf8_body(body)?).await)
}

/// POST with a path info applied to requests without their own path
pub async fn post_path(
    State(state): State<AppState>,
    Path(pathinfo): Path<String>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> AppResult<Response> {
    Ok(handle_post(state, Some(pathinfo), query, utf8_body(body)?).await)
}

fn utf8_body(body: Bytes) -> AppResult<String> {
    String::from_utf8(body.to_vec())
        .map_err(|e| RequestError::Decode(format!("request body is not UTF-8: {}", e)).into())
}

#[instrument(skip(state, query), name = "get_handler")]
async fn handle_get(state: AppState, pathinfo: Option<String>, query: Option<String>) -> Response {
    let (path_param, overrides) = parse_query(query.as_deref());
    let config = state.defaults.merged_with(&overrides);
    let pathinfo = pathinfo
        .filter(|p| !p.is_empty())
        .or(path_param)
        .unwrap_or_default();

    let segments = match split_url_path(&pathinfo) {
        Ok(segments) if segments.is_empty() => vec!["version".to_string()],
        Ok(segments) => segments,
        Err(e) => return single(ResponseEnvelope::request_error(&e, None, &config), &config),
    };

    match state.decoder.decode_segments(segments, &config) {
        Ok(request) => {
            let envelope = execute(&state, &request).await;
            single(envelope, &config)
        }
        Err(e) => {
            debug!(error = %e, "Rejected GET request");
            single(ResponseEnvelope::request_error(&e, None, &config), &config)
        }
    }
}

#[instrument(skip(state, query, body), fields(body_len = body.len()), name = "post_handler")]
async fn handle_post(
    state: AppState,
    pathinfo: Option<String>,
    query: Option<String>,
    body: String,
) -> Response {
    let (_, overrides) = parse_query(query.as_deref());
    let config = state.defaults.merged_with(&overrides);

    let url_path = match split_url_path(pathinfo.as_deref().unwrap_or_default()) {
        Ok(path) => path,
        Err(e) => return single(ResponseEnvelope::request_error(&e, None, &config), &config),
    };

    match state.decoder.decode_body(&body, &url_path, &config) {
        Ok(DecodedBody::Single(request)) => {
            let envelope = execute(&state, &request).await;
            single(envelope, &config)
        }
        Ok(DecodedBody::Batch(items)) => {
            debug!(count = items.len(), "Dispatching batch");
            let mut responses = Vec::with_capacity(items.len());
            for item in &items {
                let envelope = match item {
                    BatchItem::Request(request) => execute(&state, request).await,
                    BatchItem::Failed(failure) => ResponseEnvelope::batch_failure(failure, &config),
                };
                responses.push(envelope.to_json());
            }
            reply(StatusCode::OK, Value::Array(responses), &config)
        }
        Err(e) => {
            debug!(error = %e, "Rejected POST body");
            single(ResponseEnvelope::body_error(&e, &config), &config)
        }
    }
}

/// Run one decoded request; version requests are answered locally
async fn execute(state: &AppState, request: &JmxRequest) -> ResponseEnvelope {
    let result = match request {
        JmxRequest::Version(_) => Ok(version_value(&state.config.upstream.url)),
        _ => state.dispatcher.dispatch(request).await,
    };

    match result {
        Ok(value) => ResponseEnvelope::success(request, value),
        Err(e) => {
            warn!(request = %request, error = %e, "Upstream request failed");
            ResponseEnvelope::dispatch_error(request, &e)
        }
    }
}

/// Split a raw query into the `p` path parameter and processing options
fn parse_query(query: Option<&str>) -> (Option<String>, ProcessingConfig) {
    let mut path = None;
    let mut options = Vec::new();
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        if key == PATH_QUERY_PARAM {
            path = Some(value.into_owned());
        } else {
            options.push((key.into_owned(), value.into_owned()));
        }
    }
    (path, ProcessingConfig::from_pairs(options))
}

fn single(envelope: ResponseEnvelope, config: &ProcessingConfig) -> Response {
    let status = StatusCode::from_u16(envelope.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    reply(status, envelope.to_json(), config)
}

fn reply(status: StatusCode, body: Value, config: &ProcessingConfig) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, content_type(config))],
        body.to_string(),
    )
        .into_response()
}

/// Response content type following the `mimeType` option
fn content_type(config: &ProcessingConfig) -> &'static str {
    match config.get(ConfigKey::MimeType) {
        Some("application/json") => "application/json; charset=utf-8",
        _ => "text/plain; charset=utf-8",
    }
}
