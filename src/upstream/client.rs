//! Jolokia HTTP 클라이언트
//!
//! Connection pooling, 타임아웃, 재시도를 지원하는 비동기 HTTP 클라이언트입니다.
//! 디코딩된 요청의 JSON 에코를 그대로 업스트림 에이전트에 POST 합니다.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::RequestDispatcher;
use crate::error::DispatchError;
use crate::request::{JmxRequest, KeyOrder, RequestType};
use crate::response::ResponseEnvelope;

/// Result type for upstream calls
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Query parameter that asks the agent to keep the registered key order
const CANONICAL_NAMING_PARAM: &str = "canonicalNaming";

/// Jolokia HTTP 클라이언트
#[derive(Clone)]
pub struct JolokiaClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    auth: Option<(String, String)>,
    retry: RetryConfig,
}

/// 재시도 설정
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 최대 재시도 횟수
    pub max_retries: u32,
    /// 초기 지연 시간
    pub initial_delay: Duration,
    /// 최대 지연 시간
    pub max_delay: Duration,
    /// 지연 시간 증가 배수
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// 재시도 없는 설정
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

impl JolokiaClient {
    /// 새 클라이언트 생성
    ///
    /// # Arguments
    /// * `base_url` - Jolokia 엔드포인트 URL (예: "http://localhost:8778/jolokia")
    /// * `timeout_ms` - 요청 타임아웃 (밀리초)
    ///
    /// # Example
    /// ```ignore
    /// let client = JolokiaClient::new("http://localhost:8778/jolokia", 5000)?;
    /// ```
    pub fn new(base_url: &str, timeout_ms: u64) -> DispatchResult<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_millis(timeout_ms))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(DispatchError::HttpClientInit)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(timeout_ms),
            auth: None,
            retry: RetryConfig::default(),
        })
    }

    /// Basic Auth 설정
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.auth = Some((username.to_string(), password.to_string()));
        self
    }

    /// 재시도 설정
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// 업스트림 엔드포인트 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 단일 요청 전송
    ///
    /// 에이전트가 에러 응답을 돌려주면 [`DispatchError::Remote`]가 됩니다.
    #[instrument(skip(self, request), fields(request_type = %request.request_type()))]
    pub async fn execute(&self, request: &JmxRequest) -> DispatchResult<Value> {
        let query = upstream_query(request);
        let body = request.to_json();

        debug!(params = query.len(), "Sending Jolokia request");

        let mut req = self.client.post(&self.base_url).query(&query).json(&body);

        if let Some((username, password)) = &self.auth {
            req = req.basic_auth(username, Some(password));
        }

        let response = req.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DispatchError::AuthenticationFailed);
        }

        let text = response
            .text()
            .await
            .map_err(DispatchError::HttpResponse)?;

        match serde_json::from_str::<ResponseEnvelope>(&text) {
            Ok(envelope) => unwrap_envelope(envelope),
            Err(_) if !status.is_success() => Err(DispatchError::HttpStatus(status.as_u16())),
            Err(e) => Err(DispatchError::JsonParse(e.to_string())),
        }
    }

    /// 재시도 로직이 포함된 요청 전송
    ///
    /// 부수 효과가 있는 write, exec, notification 요청은 재시도하지 않습니다.
    pub async fn execute_with_retry(&self, request: &JmxRequest) -> DispatchResult<Value> {
        let max_retries = if is_idempotent(request.request_type()) {
            self.retry.max_retries
        } else {
            0
        };
        let mut delay = self.retry.initial_delay;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match self.execute(request).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }

                    last_error = Some(e);

                    if attempt < max_retries {
                        warn!(
                            attempt = attempt + 1,
                            max = max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "Request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        delay = std::cmp::min(
                            Duration::from_secs_f64(delay.as_secs_f64() * self.retry.multiplier),
                            self.retry.max_delay,
                        );
                    }
                }
            }
        }

        Err(last_error.unwrap_or(DispatchError::MaxRetriesExceeded))
    }

    fn map_send_error(&self, err: reqwest::Error) -> DispatchError {
        if err.is_timeout() {
            DispatchError::timeout_with_duration(self.timeout.as_millis() as u64)
        } else {
            DispatchError::from(err)
        }
    }
}

#[async_trait]
impl RequestDispatcher for JolokiaClient {
    async fn dispatch(&self, request: &JmxRequest) -> DispatchResult<Value> {
        self.execute_with_retry(request).await
    }
}

/// Query parameters sent along with `request`
///
/// Options the gateway does not consume itself are passed on. With the
/// `initial` key order the agent is asked to keep names as registered.
fn upstream_query(request: &JmxRequest) -> Vec<(String, String)> {
    let config = request.processing_config();
    let mut query: Vec<(String, String)> = config
        .forwarded_params()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    if config.key_order() == KeyOrder::Initial {
        query.push((CANONICAL_NAMING_PARAM.to_string(), "false".to_string()));
    }
    query
}

fn unwrap_envelope(envelope: ResponseEnvelope) -> DispatchResult<Value> {
    if envelope.is_success() {
        return Ok(envelope.value.unwrap_or(Value::Null));
    }
    Err(DispatchError::Remote {
        status: envelope.status,
        error: envelope
            .error
            .unwrap_or_else(|| format!("Upstream returned status {}", envelope.status)),
        error_type: envelope.error_type,
    })
}

fn is_idempotent(request_type: RequestType) -> bool {
    matches!(
        request_type,
        RequestType::Read | RequestType::Search | RequestType::List | RequestType::Version
    )
}
