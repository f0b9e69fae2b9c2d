//! 업스트림 Jolokia 에이전트 연동 모듈
//!
//! 디코딩과 검증을 마친 요청을 실제 에이전트로 전달합니다.
//!
//! # Example
//!
//! ```ignore
//! use jolokia_gateway::upstream::{JolokiaClient, RequestDispatcher};
//!
//! let client = JolokiaClient::new("http://localhost:8778/jolokia", 5000)?;
//! let value = client.dispatch(&request).await?;
//! ```

mod client;

pub use client::{DispatchResult, JolokiaClient, RetryConfig};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::request::JmxRequest;

/// Executes decoded requests against a JMX agent
#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    /// Execute `request`, returning the `value` of a success response
    async fn dispatch(&self, request: &JmxRequest) -> DispatchResult<Value>;
}

/// Protocol version spoken on the wire
pub const PROTOCOL_VERSION: &str = "7.2";

/// Value of a version request answered by the gateway itself
pub fn version_value(upstream_url: &str) -> Value {
    json!({
        "agent": env!("CARGO_PKG_VERSION"),
        "protocol": PROTOCOL_VERSION,
        "info": {
            "product": env!("CARGO_PKG_NAME"),
            "upstream": upstream_url,
        }
    })
}
