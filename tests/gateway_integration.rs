//! Gateway integration tests
//!
//! Drives the HTTP router end to end against a mock Jolokia agent:
//! - GET and POST decoding
//! - Local version answers and the type policy
//! - Batches and error envelopes

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use jolokia_gateway::config::Config;
use jolokia_gateway::server::{router, AppState};
use jolokia_gateway::upstream::{JolokiaClient, RetryConfig};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Start a mock agent answering every POST with `value`
async fn mock_agent(value: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": value,
            "status": 200,
            "timestamp": 1609459200
        })))
        .mount(&server)
        .await;
    server
}

fn gateway(server: &MockServer, config: Config) -> Router {
    let url = format!("{}/jolokia", server.uri());
    let client = JolokiaClient::new(&url, 2000)
        .expect("Failed to create client")
        .with_retry(RetryConfig::none());
    let mut config = config;
    config.upstream.url = url;
    let state = AppState::new(config, Arc::new(client)).expect("Failed to build state");
    router(state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("router failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = serde_json::from_slice(&bytes).expect("body is not JSON");
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start().await;
    let (status, body) = send(gateway(&server, Config::default()), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_get_read() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .and(body_partial_json(json!({
            "type": "read",
            "mbean": "java.lang:type=Memory",
            "attribute": "HeapMemoryUsage",
            "path": "used"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": 123456789,
            "status": 200
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = send(
        gateway(&server, Config::default()),
        get("/jolokia/read/java.lang:type=Memory/HeapMemoryUsage/used"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 200);
    assert_eq!(body["value"], 123456789);
    assert_eq!(body["request"]["mbean"], "java.lang:type=Memory");
    assert!(body["timestamp"].is_u64());
}

#[tokio::test]
async fn test_version_answered_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let app = gateway(&server, Config::default());
    let (status, body) = send(app.clone(), get("/jolokia/version")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"]["protocol"], "7.2");
    assert_eq!(body["value"]["agent"], env!("CARGO_PKG_VERSION"));

    // the bare context path means version too
    let (status, body) = send(app, get("/jolokia")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["type"], "version");
}

#[tokio::test]
async fn test_path_query_parameter() {
    let server = mock_agent(json!(42)).await;
    let (status, body) = send(
        gateway(&server, Config::default()),
        get("/jolokia?p=%2Fread%2Fjava.lang%3Atype%3DThreading%2FThreadCount"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], 42);
    assert_eq!(body["request"]["attribute"], "ThreadCount");
}

#[tokio::test]
async fn test_disabled_type_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.policy.disabled_types = vec!["exec".to_string()];

    let (status, body) = send(
        gateway(&server, config),
        get("/jolokia/exec/java.lang:type=Memory/gc"),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], 403);
    assert!(body["error"].as_str().unwrap().contains("exec"));
}

#[tokio::test]
async fn test_malformed_name() {
    let server = MockServer::start().await;
    let (status, body) = send(
        gateway(&server, Config::default()),
        get("/jolokia/read/no-colon-here/Attr"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body.get("value").is_none());
}

#[tokio::test]
async fn test_post_invalid_json() {
    let server = MockServer::start().await;
    let (status, body) = send(
        gateway(&server, Config::default()),
        post("/jolokia", "{not json"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_post_invalid_utf8() {
    let server = MockServer::start().await;
    let request = Request::builder()
        .method("POST")
        .uri("/jolokia")
        .body(Body::from(vec![0xff, 0xfe]))
        .unwrap();
    let (status, body) = send(gateway(&server, Config::default()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_post_batch_with_ignore_errors() {
    let server = mock_agent(json!({"used": 1})).await;
    let body = r#"[
        {"type": "read", "mbean": "java.lang:type=Memory", "attribute": "HeapMemoryUsage"},
        {"type": "read"},
        {"type": "version"}
    ]"#;

    let (status, body) = send(
        gateway(&server, Config::default()),
        post("/jolokia?ignoreErrors=true", body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().expect("batch answer is an array");
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["status"], 200);
    assert_eq!(items[0]["value"]["used"], 1);
    assert_eq!(items[1]["status"], 400);
    assert_eq!(items[1]["index"], 1);
    assert_eq!(items[1]["request"], json!({"type": "read"}));
    assert_eq!(items[2]["value"]["protocol"], "7.2");
}

#[tokio::test]
async fn test_batch_error_element_keeps_request() {
    let server = mock_agent(json!(1)).await;
    let body = r#"[{"type": "version"}, {"type": "read"}]"#;

    let (status, body) = send(
        gateway(&server, Config::default()),
        post("/jolokia?ignoreErrors=true&includeRequest=false", body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body[0].get("request").is_none());
    assert_eq!(body[1]["request"], json!({"type": "read"}));
    assert_eq!(body[1]["index"], 1);
}

#[tokio::test]
async fn test_post_batch_aborts_without_ignore_errors() {
    let server = mock_agent(json!(1)).await;
    let body = r#"[{"type": "version"}, {"type": "read"}]"#;

    let (status, body) = send(gateway(&server, Config::default()), post("/jolokia", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["index"], 1);
}

#[tokio::test]
async fn test_post_url_path_applies_to_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"path": "used"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": 7, "status": 200})))
        .expect(1)
        .mount(&server)
        .await;

    let body = r#"{"type": "read", "mbean": "java.lang:type=Memory", "attribute": "HeapMemoryUsage"}"#;
    let (status, body) = send(
        gateway(&server, Config::default()),
        post("/jolokia/used", body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], 7);
}

#[tokio::test]
async fn test_search_results_follow_key_order() {
    let server = mock_agent(json!(["Catalina:type=Server,j2eeType=Module"])).await;
    let app = gateway(&server, Config::default());

    let (_, body) = send(app.clone(), get("/jolokia/search/Catalina:*")).await;
    assert_eq!(body["value"], json!(["Catalina:j2eeType=Module,type=Server"]));

    let (_, body) = send(
        app,
        get("/jolokia/search/Catalina:*?objectNameKeyOrder=initial"),
    )
    .await;
    assert_eq!(body["value"], json!(["Catalina:type=Server,j2eeType=Module"]));
}

#[tokio::test]
async fn test_remote_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 404,
            "error": "javax.management.InstanceNotFoundException : d:k=v",
            "error_type": "javax.management.InstanceNotFoundException"
        })))
        .mount(&server)
        .await;

    let (status, body) = send(
        gateway(&server, Config::default()),
        get("/jolokia/read/d:k=v/Attr"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "javax.management.InstanceNotFoundException");
}

#[tokio::test]
async fn test_config_defaults_and_mime_type() {
    let server = mock_agent(json!(1)).await;
    let mut config = Config::default();
    config
        .processing
        .insert("includeRequest".to_string(), serde_yaml::Value::Bool(false));

    let app = gateway(&server, config);
    let response = app
        .clone()
        .oneshot(get("/jolokia/read/d:k=v/Attr?mimeType=application/json"))
        .await
        .unwrap();
    assert_eq!(
        response.headers()["content-type"],
        "application/json; charset=utf-8"
    );

    let (_, body) = send(app, get("/jolokia/read/d:k=v/Attr")).await;
    assert!(body.get("request").is_none());
}
