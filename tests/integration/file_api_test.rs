//! Integration tests for the input and output blob containers.

mod helpers;

use axum::http::{StatusCode, header};
use serde_json::json;

#[tokio::test]
async fn test_upload_list_download_delete() {
    let app = helpers::TestApp::new().await;

    let uploaded = app
        .upload("input", &[("a.wav", b"RIFF-a"), ("b.wav", b"RIFF-bb")])
        .await;
    assert_eq!(uploaded.status, StatusCode::OK);
    assert_eq!(uploaded.body, json!(["a.wav", "b.wav"]));

    let listed = app.request("GET", "/api/input", None).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(
        listed.body,
        json!([{"name": "a.wav", "size": 6}, {"name": "b.wav", "size": 7}])
    );

    let downloaded = app.request("GET", "/api/input/b.wav", None).await;
    assert_eq!(downloaded.status, StatusCode::OK);
    assert_eq!(&downloaded.raw[..], b"RIFF-bb");
    assert_eq!(
        downloaded.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=b.wav"
    );
    assert_eq!(
        downloaded.headers[header::CONTENT_TYPE],
        "application/octet-stream"
    );

    let deleted = app.request("DELETE", "/api/input/a.wav", None).await;
    assert_eq!(deleted.body, json!("a.wav deleted successfully"));

    let listed = app.request("GET", "/api/input", None).await;
    assert_eq!(listed.body, json!([{"name": "b.wav", "size": 7}]));
}

#[tokio::test]
async fn test_containers_are_independent() {
    let app = helpers::TestApp::new().await;
    app.upload("output", &[("a.mp3", b"ID3")]).await;

    let input = app.request("GET", "/api/input", None).await;
    let output = app.request("GET", "/api/output", None).await;

    assert_eq!(input.body, json!([]));
    assert_eq!(output.body, json!([{"name": "a.mp3", "size": 3}]));
}

#[tokio::test]
async fn test_download_missing_file_is_not_found() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/api/output/missing.mp3", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_upload_without_files_is_bad_request() {
    let app = helpers::TestApp::new().await;

    let response = app.upload("input", &[]).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clear_container() {
    let app = helpers::TestApp::new().await;
    app.upload("input", &[("a.wav", b"a"), ("b.wav", b"b")]).await;

    let response = app.request("DELETE", "/api/input", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!("audio-input cleared successfully"));
    let listed = app.request("GET", "/api/input", None).await;
    assert_eq!(listed.body, json!([]));
}
