//! Request decoding integration tests
//!
//! End-to-end scenarios through the public decoder API: GET paths, POST
//! bodies, batches and the JSON echo.

use jolokia_gateway::error::{ErrorKind, RequestError};
use jolokia_gateway::request::{
    Attributes, BatchItem, ConfigKey, DecodedBody, HasObjectName, JmxRequest, ProcessingConfig,
    RequestDecoder,
};
use serde_json::{json, Value};

fn decoder() -> RequestDecoder {
    RequestDecoder::default()
}

fn post(body: Value, config: &ProcessingConfig) -> JmxRequest {
    decoder().decode_json(&body, config).unwrap()
}

#[test]
fn test_get_read_with_path() {
    let request = decoder()
        .decode_url(
            "/read/java.lang:type=Memory/HeapMemoryUsage/used",
            &ProcessingConfig::new(),
        )
        .unwrap();

    let JmxRequest::Read(read) = &request else {
        panic!("expected a read request, got {request}");
    };
    assert_eq!(read.attributes(), &Attributes::Single("HeapMemoryUsage".into()));
    assert_eq!(request.path_parts(), &["used".to_string()]);

    let named = request.as_object_name_request().unwrap();
    assert_eq!(named.object_name_as_string(), "java.lang:type=Memory");
    assert_eq!(named.object_name().domain(), "java.lang");
}

#[test]
fn test_post_read_key_ordering() {
    let body = json!({"type": "read", "mbean": "Catalina:type=Server,j2eeType=Module"});

    let canonical = post(body.clone(), &ProcessingConfig::new());
    let name = canonical.object_name().unwrap();
    assert_eq!(name.canonical(), "Catalina:j2eeType=Module,type=Server");
    assert_eq!(
        canonical.ordered_object_name(name),
        "Catalina:j2eeType=Module,type=Server"
    );

    let config = ProcessingConfig::new().with(ConfigKey::ObjectNameKeyOrder, "initial");
    let initial = post(body, &config);
    let name = initial.object_name().unwrap();
    assert_eq!(
        initial.ordered_object_name(name),
        "Catalina:type=Server,j2eeType=Module"
    );
    // the echo stays canonical whatever the ordering option
    assert_eq!(
        initial.to_json()["mbean"],
        json!("Catalina:j2eeType=Module,type=Server")
    );
}

#[test]
fn test_post_read_without_name() {
    let err = decoder()
        .decode_json(&json!({"type": "read"}), &ProcessingConfig::new())
        .unwrap_err();
    assert_eq!(err, RequestError::MissingName);
    assert_eq!(err.kind(), ErrorKind::MissingName);
    assert_eq!(err.status(), 400);
}

#[test]
fn test_post_read_malformed_name() {
    let err = decoder()
        .decode_json(
            &json!({"type": "read", "mbean": "no-colon-here"}),
            &ProcessingConfig::new(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedName);
}

#[test]
fn test_batch_with_ignore_errors() {
    let config = ProcessingConfig::new().with(ConfigKey::IgnoreErrors, "true");
    let body = r#"[
        {"type": "read", "mbean": "java.lang:type=Memory"},
        {"type": "read"}
    ]"#;

    let DecodedBody::Batch(items) = decoder().decode_body(body, &[], &config).unwrap() else {
        panic!("expected a batch");
    };
    assert_eq!(items.len(), 2);
    assert!(matches!(&items[0], BatchItem::Request(JmxRequest::Read(_))));
    match &items[1] {
        BatchItem::Failed(failure) => {
            assert_eq!(failure.index, 1);
            assert_eq!(failure.error.kind(), ErrorKind::MissingName);
            assert_eq!(failure.request, json!({"type": "read"}));
        }
        other => panic!("expected a failed element, got {other:?}"),
    }
}

#[test]
fn test_batch_isolation_counts() {
    let config = ProcessingConfig::new().with(ConfigKey::IgnoreErrors, "true");
    let items: Vec<Value> = (0..10)
        .map(|i| {
            if i % 3 == 0 {
                json!({"type": "exec", "mbean": "d:k=v"})
            } else {
                json!({"type": "read", "mbean": format!("d:k={}", i)})
            }
        })
        .collect();

    let decoded = decoder().decode_batch(&items, &[], &config).unwrap();
    assert_eq!(decoded.len(), 10);
    let failed: Vec<usize> = decoded
        .iter()
        .filter_map(|item| match item {
            BatchItem::Failed(f) => Some(f.index),
            BatchItem::Request(_) => None,
        })
        .collect();
    assert_eq!(failed, vec![0, 3, 6, 9]);
}

#[test]
fn test_get_exec_boolean_arguments() {
    let request = decoder()
        .decode_url(
            "/exec/java.lang:type=Threading/dumpAllThreads/true/true",
            &ProcessingConfig::new(),
        )
        .unwrap();

    let JmxRequest::Exec(exec) = &request else {
        panic!("expected an exec request, got {request}");
    };
    assert_eq!(exec.operation(), "dumpAllThreads");
    assert_eq!(exec.arguments(), &[json!(true), json!(true)]);
}

#[test]
fn test_get_escaped_segments() {
    let request = decoder()
        .decode_url(
            "/read/jboss.jmx:alias=jmx!/rmi!/Invoker/Attr/inner!/path",
            &ProcessingConfig::new(),
        )
        .unwrap();
    assert_eq!(
        request.object_name().unwrap().canonical(),
        "jboss.jmx:alias=jmx/rmi/Invoker"
    );
    assert_eq!(request.path_parts(), &["inner/path".to_string()]);
    assert_eq!(request.to_json()["path"], json!("inner!/path"));
}

#[test]
fn test_echo_fidelity() {
    let config = ProcessingConfig::new();
    let bodies = [
        json!({"type": "read", "mbean": "java.lang:type=Memory", "attribute": ["HeapMemoryUsage", "NonHeapMemoryUsage"]}),
        json!({"type": "write", "mbean": "d:k=v", "attribute": "Level", "value": {"a": [1, 2]}, "path": "x!/y/z"}),
        json!({"type": "exec", "mbean": "d:k=v", "operation": "op(int,java.lang.String)", "arguments": [1, null, "s"]}),
        json!({"type": "search", "mbean": "*:type=Memory,*"}),
        json!({"type": "list", "path": "java.lang/type=Memory"}),
        json!({"type": "version", "custom": {"kept": true}}),
        json!({"type": "notification", "command": "add", "client": "c1", "mbean": "d:k=v"}),
        json!({"type": "read", "mbean": "d:k=v", "target": {"url": "service:jmx:rmi:///jndi/rmi://host:9999/jmxrmi"}}),
    ];

    for body in bodies {
        let request = post(body.clone(), &config);
        let echo = request.to_json();
        let again = post(echo.clone(), &config);
        assert_eq!(again, request, "decode(echo) differs for {body}");
        assert_eq!(
            serde_json::to_string(&again.to_json()).unwrap(),
            serde_json::to_string(&echo).unwrap()
        );
    }
}

#[test]
fn test_echo_with_doubled_trailing_slash() {
    let config = ProcessingConfig::new();
    for url in ["/read/d:k=v/A//", "/list//", "/read/d:k=v/A/x//-"] {
        let request = decoder().decode_url(url, &config).unwrap();
        let echo = request.to_json();
        let again = post(echo.clone(), &config);
        assert_eq!(again, request, "decode(echo) differs for {url}");
        assert_eq!(
            serde_json::to_string(&again.to_json()).unwrap(),
            serde_json::to_string(&echo).unwrap()
        );
    }

    let request = decoder().decode_url("/read/d:k=v/A//", &config).unwrap();
    assert!(request.path_parts().is_empty());
    assert!(request.to_json().get("path").is_none());
}

#[test]
fn test_get_and_post_agree() {
    let config = ProcessingConfig::new();
    let get = decoder()
        .decode_url("/write/d:k=v/Level/FINE", &config)
        .unwrap();
    let post = post(
        json!({"type": "write", "mbean": "d:k=v", "attribute": "Level", "value": "FINE"}),
        &config,
    );
    assert_eq!(get.to_json(), post.to_json());
}

#[test]
fn test_display() {
    let request = decoder()
        .decode_url("/read/java.lang:type=Memory/HeapMemoryUsage", &ProcessingConfig::new())
        .unwrap();
    assert_eq!(
        request.to_string(),
        "JmxRequest[type = read, attribute = HeapMemoryUsage, objectName = java.lang:type=Memory]"
    );
}
