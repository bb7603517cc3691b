//! End-to-end tests over the full router: JSON CRUD, the upload cap,
//! file serving, and the webhook guard. Each test gets its own temp
//! database and upload directory.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use diary_api::state::{AppState, AppStateInner};
use diary_db::Database;
use diary_storage::FileStore;

const BOUNDARY: &str = "x-diary-test-boundary";

async fn test_app(max_upload_bytes: u64) -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::open(&dir.path().join("diary.db")).unwrap());
    let store = Arc::new(FileStore::new(dir.path().join("uploads")).await.unwrap());
    let state: AppState = Arc::new(AppStateInner {
        db: Some(db),
        store,
        bot: None,
        max_upload_bytes,
    });
    (diary_api::router(state), dir)
}

async fn read_json(res: axum::response::Response) -> (StatusCode, Value) {
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_json(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    read_json(app.clone().oneshot(req).await.unwrap()).await
}

async fn get_json(app: &Router, path: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(path).body(Body::empty()).unwrap();
    read_json(app.clone().oneshot(req).await.unwrap()).await
}

async fn get_raw(app: &Router, path: &str) -> StatusCode {
    let req = Request::builder().uri(path).body(Body::empty()).unwrap();
    app.clone().oneshot(req).await.unwrap().status()
}

fn multipart_body(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (filename, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn post_upload(app: &Router, parts: &[(&str, &[u8])]) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    read_json(app.clone().oneshot(req).await.unwrap()).await
}

fn upload_dir_file_count(dir: &tempfile::TempDir) -> usize {
    std::fs::read_dir(dir.path().join("uploads")).unwrap().count()
}

#[tokio::test]
async fn ping_is_alive() {
    let (app, _dir) = test_app(1024).await;
    let (status, body) = get_json(&app, "/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn homework_crud_roundtrip() {
    let (app, _dir) = test_app(1024).await;

    let (status, body) = post_json(
        &app,
        "/api/hw_add",
        json!({
            "subject": "Алгебра",
            "description": "Ст. 10-12",
            "date": "2031-09-01",
            "is_important": true
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, all) = get_json(&app, "/api/hw_all").await;
    assert_eq!(status, StatusCode::OK);
    let tasks = all.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["subject"], "Алгебра");
    // No author supplied on create, so the placeholder shows.
    assert_eq!(tasks[0]["author"], "—");
    assert_eq!(tasks[0]["is_important"], true);
    let id = tasks[0]["id"].as_i64().unwrap();

    let (status, body) = post_json(
        &app,
        "/api/hw_update",
        json!({
            "id": id,
            "subject": "Геометрія",
            "description": "Ст. 10-12",
            "date": "2031-09-02",
            "is_important": false
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (_, all) = get_json(&app, "/api/hw_all").await;
    let tasks = all.as_array().unwrap();
    assert_eq!(tasks[0]["subject"], "Геометрія");
    assert_eq!(tasks[0]["date"], "2031-09-02");
    assert_eq!(tasks[0]["is_important"], false);

    let (status, body) = post_json(&app, "/api/hw_delete", json!({ "id": id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (_, all) = get_json(&app, "/api/hw_all").await;
    assert!(all.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn hw_returns_three_labelled_days() {
    let (app, _dir) = test_app(1024).await;
    let (status, body) = get_json(&app, "/api/hw").await;
    assert_eq!(status, StatusCode::OK);
    let sections = body.as_object().unwrap();
    assert_eq!(sections.len(), 3);
    let labels: Vec<&str> = sections
        .values()
        .map(|s| s["label"].as_str().unwrap())
        .collect();
    assert!(labels.contains(&"Сьогодні"));
    assert!(labels.contains(&"Завтра"));
}

#[tokio::test]
async fn add_rejects_missing_fields() {
    let (app, _dir) = test_app(1024).await;

    let (status, body) =
        post_json(&app, "/api/hw_add", json!({ "description": "x", "date": "2031-09-01" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let (status, _) = post_json(
        &app,
        "/api/hw_add",
        json!({ "subject": "x", "description": "y", "date": "01.09.2031" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &app,
        "/api/hw_update",
        json!({ "subject": "x", "description": "y", "date": "2031-09-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_enforces_cumulative_cap() {
    let (app, dir) = test_app(8).await;

    // Exactly at the cap passes.
    let (status, body) = post_upload(&app, &[("a.bin", &[1u8; 8])]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["files"].as_array().unwrap().len(), 1);
    assert_eq!(upload_dir_file_count(&dir), 1);

    // One byte over, spread across two files, is rejected and the
    // partial second file does not linger.
    let (app, dir) = test_app(8).await;
    let (status, body) =
        post_upload(&app, &[("a.bin", &[1u8; 5]), ("b.bin", &[2u8; 4])]).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["status"], "error");
    // Only the first, fully-received file may remain.
    assert!(upload_dir_file_count(&dir) <= 1);
}

#[tokio::test]
async fn zero_byte_uploads_are_discarded() {
    let (app, dir) = test_app(1024).await;
    let (status, body) = post_upload(&app, &[("empty.txt", b"")]).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["files"].as_array().unwrap().is_empty());
    assert_eq!(upload_dir_file_count(&dir), 0);
}

#[tokio::test]
async fn uploaded_file_is_served_and_unlinked_on_delete() {
    let (app, _dir) = test_app(1024).await;

    let (status, body) = post_upload(&app, &[("notes.pdf", b"pdf-bytes")]).await;
    assert_eq!(status, StatusCode::OK);
    let file = &body["files"][0];
    let stored = file["stored_name"].as_str().unwrap().to_string();
    let url = file["url"].as_str().unwrap().to_string();
    assert_eq!(url, format!("/files/{}", stored));

    assert_eq!(get_raw(&app, &url).await, StatusCode::OK);

    let (status, _) = post_json(
        &app,
        "/api/hw_add",
        json!({
            "subject": "Фізика",
            "description": "Конспект",
            "date": "2031-09-01",
            "attachments": [
                { "stored_name": stored, "name": "notes.pdf", "mime": "application/pdf", "size": 9 }
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, all) = get_json(&app, "/api/hw_all").await;
    let tasks = all.as_array().unwrap();
    assert_eq!(tasks[0]["attachments"].as_array().unwrap().len(), 1);
    let id = tasks[0]["id"].as_i64().unwrap();

    let (status, _) = post_json(&app, "/api/hw_delete", json!({ "id": id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(get_raw(&app, &url).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_replaces_attachment_set_and_unlinks_dropped_files() {
    let (app, _dir) = test_app(1024).await;

    let (_, body) = post_upload(&app, &[("keep.txt", b"keep"), ("drop.txt", b"drop")]).await;
    let files = body["files"].as_array().unwrap();
    let keep = files[0].clone();
    let drop_url = files[1]["url"].as_str().unwrap().to_string();

    let (status, _) = post_json(
        &app,
        "/api/hw_add",
        json!({
            "subject": "Хімія",
            "description": "Лаб. робота",
            "date": "2031-09-01",
            "attachments": [
                { "stored_name": files[0]["stored_name"], "name": "keep.txt" },
                { "stored_name": files[1]["stored_name"], "name": "drop.txt" }
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, all) = get_json(&app, "/api/hw_all").await;
    let id = all[0]["id"].as_i64().unwrap();
    assert_eq!(all[0]["attachments"].as_array().unwrap().len(), 2);

    let (status, _) = post_json(
        &app,
        "/api/hw_update",
        json!({
            "id": id,
            "subject": "Хімія",
            "description": "Лаб. робота",
            "date": "2031-09-01",
            "attachments": [
                { "stored_name": keep["stored_name"], "name": "keep.txt" }
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, all) = get_json(&app, "/api/hw_all").await;
    let atts = all[0]["attachments"].as_array().unwrap();
    assert_eq!(atts.len(), 1);
    assert_eq!(atts[0]["name"], "keep.txt");
    assert_eq!(get_raw(&app, keep["url"].as_str().unwrap()).await, StatusCode::OK);
    assert_eq!(get_raw(&app, &drop_url).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn file_names_are_validated_before_lookup() {
    let (app, _dir) = test_app(1024).await;

    // Foreign name, never touches the filesystem.
    assert_eq!(get_raw(&app, "/files/secret.txt").await, StatusCode::BAD_REQUEST);

    // Well-formed token that was never issued.
    let ghost = format!("/files/{}.txt", "a".repeat(32));
    assert_eq!(get_raw(&app, &ghost).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn webhook_without_bot_is_unavailable() {
    let (app, _dir) = test_app(1024).await;
    let (status, body) = post_json(
        &app,
        "/webhook/telegram",
        json!({ "update_id": 1, "message": null }),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
}
