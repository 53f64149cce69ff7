//! HTTP trigger endpoints served over an in-memory store.

mod common;

use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use common::{FakeStore, ROOT};
use drive_backup::server::{router, AppState};
use drive_backup::{FixedClock, SyncOrchestrator};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn app(store: &Arc<FakeStore>, source_dir: &Path) -> Router {
    let orchestrator = SyncOrchestrator::new(store.clone(), ROOT)
        .with_source_dir(source_dir)
        .with_clock(Arc::new(FixedClock(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        )));
    router(AppState::with_store(store.clone(), orchestrator))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let store = Arc::new(FakeStore::new());
    let (status, body) = send(app(&store, Path::new("/nonexistent")), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
}

#[tokio::test]
async fn test_backup_uploads_into_dated_folder() {
    let source = TempDir::new().unwrap();
    std::fs::write(source.path().join("2024-04-30.md"), "yesterday").unwrap();
    std::fs::write(source.path().join("2024-05-01.md"), "today").unwrap();
    let store = Arc::new(FakeStore::new());

    let request = Request::builder()
        .method("POST")
        .uri("/api/drive/backup")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&store, source.path()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Backed up 2 files");
    assert_eq!(body["files"][0]["name"], "2024-04-30.md");
    assert!(body["files"][0]["id"].is_string());

    let folder = &store.files()[0].parent_id;
    assert_eq!(store.path_of(folder), "root/Backups/2024-05-01");
}

#[tokio::test]
async fn test_backup_with_missing_source_uploads_nothing() {
    let store = Arc::new(FakeStore::new());

    let request = Request::builder()
        .method("POST")
        .uri("/api/drive/backup")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&store, Path::new("/nonexistent/memory")), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Backed up 0 files");
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_list_returns_root_children() {
    let store = Arc::new(FakeStore::new());
    store.add_folder("Backups", ROOT);
    store.add_folder("kanban", ROOT);

    let (status, body) = send(
        app(&store, Path::new("/nonexistent")),
        get("/api/drive/backup"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Backups", "kanban"]);
}

#[tokio::test]
async fn test_sync_uploads_directory() {
    let local = TempDir::new().unwrap();
    std::fs::write(local.path().join("board.json"), "{}").unwrap();
    let store = Arc::new(FakeStore::new());

    let request = post_json(
        "/api/drive/sync",
        json!({
            "projectName": "kanban",
            "localPath": local.path(),
            "dateFolder": "2024-05-01"
        }),
    );
    let (status, body) = send(app(&store, Path::new("/nonexistent")), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Synced 1 files");
    assert_eq!(body["files"][0]["name"], "board.json");
    assert!(body["failed"].as_array().unwrap().is_empty());

    let folder = &store.files()[0].parent_id;
    assert_eq!(store.path_of(folder), "root/kanban/2024-05-01");
}

#[tokio::test]
async fn test_sync_reports_partial_failure() {
    let local = TempDir::new().unwrap();
    for name in ["a.txt", "b.txt", "c.txt"] {
        std::fs::write(local.path().join(name), name).unwrap();
    }
    let store = Arc::new(FakeStore::new());
    store.fail_upload_of("b.txt");

    let request = post_json(
        "/api/drive/sync",
        json!({"projectName": "kanban", "localPath": local.path()}),
    );
    let (status, body) = send(app(&store, Path::new("/nonexistent")), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Synced 2 files, 1 failed");
    assert_eq!(body["failed"][0]["name"], "b.txt");
}

#[tokio::test]
async fn test_sync_missing_fields_is_bad_request() {
    let store = Arc::new(FakeStore::new());

    let request = post_json("/api/drive/sync", json!({"projectName": "kanban"}));
    let (status, body) = send(app(&store, Path::new("/nonexistent")), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_sync_empty_fields_is_bad_request() {
    let store = Arc::new(FakeStore::new());

    let request = post_json(
        "/api/drive/sync",
        json!({"projectName": "", "localPath": "/data/projects/kanban"}),
    );
    let (status, body) = send(app(&store, Path::new("/nonexistent")), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing projectName or localPath");
}

#[tokio::test]
async fn test_sync_unknown_field_is_bad_request() {
    let store = Arc::new(FakeStore::new());

    let request = post_json(
        "/api/drive/sync",
        json!({"projectName": "kanban", "localPath": "/tmp", "recursive": true}),
    );
    let (status, _) = send(app(&store, Path::new("/nonexistent")), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sync_unreadable_path_is_server_error() {
    let store = Arc::new(FakeStore::new());

    let request = post_json(
        "/api/drive/sync",
        json!({"projectName": "kanban", "localPath": "/nonexistent/kanban/export"}),
    );
    let (status, body) = send(app(&store, Path::new("/nonexistent")), request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    // Details are logged, not returned.
    assert_eq!(body["error"], "Sync failed");
    assert_eq!(store.call_count(), 0);
}
