//! Integration tests for task submission and status endpoints.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use manic_entity::{AudioTask, MessageEnvelope, MessageType};

#[tokio::test]
async fn test_hello() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/api/hello", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "Hello from Manic Compression Server!");
}

#[tokio::test]
async fn test_health_reports_memory_transport() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/api/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["queue_transport"], "memory");
    assert_eq!(response.body["queue_healthy"], true);
    assert_eq!(response.body["storage_healthy"], true);
}

#[tokio::test]
async fn test_start_then_active_tasks() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/api/start",
            Some(json!({
                "inputFiles": ["a.wav", "b.wav"],
                "clientID": "client-1",
                "audioFunctionPipeline": ["Apply Effect 1"]
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let tasks = response.body["tasks"].as_array().expect("tasks array");
    assert_eq!(tasks.len(), 2);
    for task in tasks {
        assert_eq!(task["status"], "In Progress");
        assert_eq!(task["clientID"], "client-1");
        assert_eq!(task["audioFunctionPipeline"], json!(["ApplyEffect1"]));
    }
    assert_ne!(tasks[0]["taskID"], tasks[1]["taskID"]);

    let active = app.request("GET", "/api/activeTasks", None).await;
    assert_eq!(active.status, StatusCode::OK);
    let active = active.body.as_object().expect("task mapping");
    assert_eq!(active.len(), 2);
    for task in tasks {
        let id = task["taskID"].as_str().expect("task id");
        assert_eq!(&active[id], task);
    }

    let completed = app.request("GET", "/api/completedTasks", None).await;
    assert_eq!(completed.body, json!({}));
}

#[tokio::test]
async fn test_start_without_files_is_bad_request() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/api/start",
            Some(json!({
                "inputFiles": [],
                "clientID": "client-1",
                "audioFunctionPipeline": ["WAV to MP3"]
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_clear_active_tasks() {
    let app = helpers::TestApp::new().await;
    app.request(
        "POST",
        "/api/start",
        Some(json!({
            "inputFiles": ["a.wav", "b.wav", "c.wav"],
            "clientID": "client-1",
            "audioFunctionPipeline": ["WAV to MP3"]
        })),
    )
    .await;

    let response = app.request("POST", "/api/clearActiveTasks", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!("audiotasks cleared successfully"));

    let active = app.request("GET", "/api/activeTasks", None).await;
    assert_eq!(active.body, json!({}));
}

#[tokio::test]
async fn test_completed_tasks_read_results_queue() {
    let app = helpers::TestApp::new().await;
    let done = AudioTask::with_id("t-9", "client-1", "a.wav", vec!["WavToMP3".to_string()])
        .complete("a.mp3");
    let envelope = MessageEnvelope::new(
        MessageType::PROCESS_AUDIO_RESULT,
        done.serialize().expect("serialize task"),
    );
    let orchestrator = &app.state.orchestrator;
    orchestrator
        .client()
        .send_message(&envelope, orchestrator.results_queue())
        .await
        .expect("send result");

    let response = app.request("GET", "/api/completedTasks", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["t-9"]["status"], "Completed");
    assert_eq!(response.body["t-9"]["outputFile"], "a.mp3");

    let cleared = app.request("POST", "/api/clearCompletedTasks", None).await;
    assert_eq!(cleared.body, json!("audiotaskresults cleared successfully"));
}

#[tokio::test]
async fn test_functions_lists_catalogue() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/api/functions", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!(["Apply Effect 1", "Apply Effect 2", "WAV to MP3"])
    );
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = helpers::TestApp::new().await;
    let req = axum::http::Request::builder()
        .method("OPTIONS")
        .uri("/api/start")
        .header("Origin", "http://example.com")
        .header("Access-Control-Request-Method", "POST")
        .body(axum::body::Body::empty())
        .expect("request");

    let response = app.send(req).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers["access-control-allow-origin"], "*");
    assert_eq!(response.headers["access-control-max-age"], "300");
}
