//! 업스트림 클라이언트 통합 테스트
//!
//! wiremock을 사용한 HTTP 모킹 테스트

use std::time::Duration;

use jolokia_gateway::error::DispatchError;
use jolokia_gateway::request::{ConfigKey, JmxRequest, ProcessingConfig, RequestDecoder};
use jolokia_gateway::upstream::{JolokiaClient, RequestDispatcher, RetryConfig};
use serde_json::json;
use wiremock::matchers::{basic_auth, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn decode(pathinfo: &str, config: &ProcessingConfig) -> JmxRequest {
    RequestDecoder::default().decode_url(pathinfo, config).unwrap()
}

fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

#[tokio::test]
async fn test_read_posts_canonical_echo() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .and(body_json(json!({
            "type": "read",
            "mbean": "java.lang:type=Memory",
            "attribute": "HeapMemoryUsage",
            "path": "used"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request": {"mbean": "java.lang:type=Memory", "type": "read"},
            "value": 52428800_i64,
            "timestamp": 1609459200,
            "status": 200
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/jolokia", mock_server.uri());
    let client = JolokiaClient::new(&url, 5000).unwrap();
    let request = decode(
        "/read/java.lang:type=Memory/HeapMemoryUsage/used",
        &ProcessingConfig::new(),
    );
    let value = client.dispatch(&request).await.unwrap();

    assert_eq!(value, json!(52428800_i64));
}

#[tokio::test]
async fn test_forwarded_processing_options() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(query_param("maxDepth", "2"))
        .and(query_param("canonicalNaming", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": ["Catalina:type=Server,j2eeType=Module"],
            "status": 200
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = ProcessingConfig::new()
        .with(ConfigKey::MaxDepth, "2")
        .with(ConfigKey::ObjectNameKeyOrder, "initial");
    let client = JolokiaClient::new(&mock_server.uri(), 5000).unwrap();
    let value = client
        .dispatch(&decode("/search/Catalina:*", &config))
        .await
        .unwrap();

    assert_eq!(value, json!(["Catalina:type=Server,j2eeType=Module"]));
}

#[tokio::test]
async fn test_basic_auth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(basic_auth("admin", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": 1, "status": 200})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = JolokiaClient::new(&mock_server.uri(), 5000)
        .unwrap()
        .with_auth("admin", "secret");
    let value = client
        .dispatch(&decode("/read/test:type=Test", &ProcessingConfig::new()))
        .await
        .unwrap();

    assert_eq!(value, json!(1));
}

#[tokio::test]
async fn test_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let client = JolokiaClient::new(&mock_server.uri(), 5000).unwrap();
    let err = client
        .dispatch(&decode("/read/test:type=Test", &ProcessingConfig::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::AuthenticationFailed));
    assert_eq!(err.http_status(), 401);
}

#[tokio::test]
async fn test_timeout_handling() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let client = JolokiaClient::new(&mock_server.uri(), 100)
        .unwrap()
        .with_retry(RetryConfig::none());
    let err = client
        .dispatch(&decode("/read/java.lang:type=Memory", &ProcessingConfig::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Timeout(Some(100))));
    assert_eq!(err.http_status(), 504);
}

#[tokio::test]
async fn test_remote_error_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request": {"mbean": "invalid:type=NotFound", "type": "read"},
            "error_type": "javax.management.InstanceNotFoundException",
            "error": "javax.management.InstanceNotFoundException : invalid:type=NotFound",
            "status": 404
        })))
        .mount(&mock_server)
        .await;

    let client = JolokiaClient::new(&mock_server.uri(), 5000).unwrap();
    let err = client
        .dispatch(&decode("/read/invalid:type=NotFound", &ProcessingConfig::new()))
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), 404);
    assert_eq!(err.error_type(), "javax.management.InstanceNotFoundException");
}

#[tokio::test]
async fn test_http_500_is_retried_for_reads() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = JolokiaClient::new(&mock_server.uri(), 5000)
        .unwrap()
        .with_retry(fast_retry(2));
    let err = client
        .dispatch(&decode("/read/java.lang:type=Memory", &ProcessingConfig::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::HttpStatus(500)));
}

#[tokio::test]
async fn test_exec_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = JolokiaClient::new(&mock_server.uri(), 5000)
        .unwrap()
        .with_retry(fast_retry(3));
    let result = client
        .dispatch(&decode("/exec/java.lang:type=Memory/gc", &ProcessingConfig::new()))
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_invalid_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not jolokia</html>"))
        .mount(&mock_server)
        .await;

    let client = JolokiaClient::new(&mock_server.uri(), 5000).unwrap();
    let err = client
        .dispatch(&decode("/read/java.lang:type=Memory", &ProcessingConfig::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::JsonParse(_)));
    assert_eq!(err.http_status(), 502);
}
