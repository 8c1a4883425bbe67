#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use painel_api::config::{ImportConfig, ServerConfig};
use painel_api::registry::SessionRegistry;
use painel_api::router::build_app_router;
use painel_api::state::{AppState, ImportBackend};
use painel_events::EventBus;
use painel_pipeline::MemorySink;

const BOUNDARY: &str = "painel-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_url: None,
        import: ImportConfig::default(),
    }
}

/// The router plus handles tests inspect directly.
pub struct TestApp {
    pub router: Router,
    pub sink: Arc<MemorySink>,
    pub registry: Arc<SessionRegistry>,
}

/// Full middleware stack backed by `sink`.
pub fn build_test_app(sink: MemorySink) -> TestApp {
    let config = test_config();
    let sink = Arc::new(sink);
    let registry = Arc::new(SessionRegistry::new());

    let state = AppState {
        config: Arc::new(config.clone()),
        backend: ImportBackend::Memory(Arc::clone(&sink)),
        registry: Arc::clone(&registry),
        event_bus: Arc::new(EventBus::default()),
    };

    TestApp {
        router: build_app_router(state, &config),
        sink,
        registry,
    }
}

/// Multipart body with a single `file` part.
pub fn multipart_request(method: Method, uri: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Send a request and parse the JSON body (`Null` when empty).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Upload `content` and return the new session ID.
pub async fn open_session(app: &Router, filename: &str, content: &[u8]) -> String {
    let (status, json) = send(
        app,
        multipart_request(Method::POST, "/api/v1/imports", filename, content),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "body: {json}");
    json["data"]["id"].as_str().unwrap().to_string()
}

/// Poll the status endpoint until the session reaches `state`.
pub async fn wait_for_state(app: &Router, id: &str, state: &str) -> serde_json::Value {
    for _ in 0..250 {
        let (_, json) = send(app, empty_request(Method::GET, &format!("/api/v1/imports/{id}"))).await;
        if json["data"]["session"]["state"] == state {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("session {id} never reached state {state}");
}
