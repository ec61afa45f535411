//! Shared test helpers for integration tests.

#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use manic_api::AppState;
use manic_core::config::AppConfig;

/// Multipart boundary used by upload requests
const BOUNDARY: &str = "manic-test-boundary";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state, for seeding queues directly
    pub state: AppState,
    /// Blob root; removed when the app is dropped
    _blob_dir: TempDir,
}

impl TestApp {
    /// Create a new test application over the in-memory transport
    pub async fn new() -> Self {
        let blob_dir = tempfile::tempdir().expect("Failed to create blob dir");

        let mut config = AppConfig::default();
        config.queue.backend = "memory".to_string();
        config.queue.receive_timeout_ms = 100;
        config.storage.root_path = blob_dir.path().to_string_lossy().into_owned();

        let state = manic_api::build_state(config)
            .await
            .expect("Failed to build app state");
        let router = manic_api::build_app(state.clone());

        Self {
            router,
            state,
            _blob_dir: blob_dir,
        }
    }

    /// Make a JSON request
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        self.send(req).await
    }

    /// Upload files to a container as multipart `files` fields
    pub async fn upload(&self, container: &str, files: &[(&str, &[u8])]) -> TestResponse {
        let mut body = Vec::new();
        for (name, data) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; \
                     filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri(format!("/api/{container}"))
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("Failed to build request");

        self.send(req).await
    }

    /// Send a prepared request through the router
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let raw = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&raw).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            raw,
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Parsed JSON body (`Null` when not JSON)
    pub body: Value,
    /// Raw body bytes
    pub raw: Bytes,
}

impl TestResponse {
    /// Body as UTF-8 text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }
}
