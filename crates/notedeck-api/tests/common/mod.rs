//! Shared helpers for router-level tests.
//!
//! The router is wired to the in-memory database and object store, so these
//! tests need neither PostgreSQL nor MinIO.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use notedeck_api::{build_router, AppState, MissingNotePolicy, ServerConfig};
use notedeck_db::{MemoryBackend, MemoryDatabase, ObjectStoreGateway, DEFAULT_URL_TTL};

pub const BUCKET: &str = "notes-files";
pub const BOUNDARY: &str = "notedeck-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub db: Arc<MemoryDatabase>,
    pub backend: Arc<MemoryBackend>,
}

pub fn server_config() -> ServerConfig {
    ServerConfig {
        static_dir: None,
        ..ServerConfig::default()
    }
}

pub fn state(policy: MissingNotePolicy) -> (AppState, Arc<MemoryDatabase>, Arc<MemoryBackend>) {
    let db = Arc::new(MemoryDatabase::new());
    let backend = Arc::new(MemoryBackend::new());
    let store = ObjectStoreGateway::from_arc(backend.clone(), BUCKET, DEFAULT_URL_TTL);
    let state = AppState::new(db.clone(), db.clone(), store, policy);
    (state, db, backend)
}

pub fn test_app() -> TestApp {
    test_app_with_policy(MissingNotePolicy::NotFound)
}

pub fn test_app_with_policy(policy: MissingNotePolicy) -> TestApp {
    let (state, db, backend) = state(policy);
    TestApp {
        router: build_router(state, &server_config()),
        db,
        backend,
    }
}

/// Send a request and decode the body as JSON (`Value::Null` when empty).
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

/// Build a multipart/form-data body with a single file part.
pub fn multipart_body(field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(note_id: i64, file_name: &str, data: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/notes/{}/upload-file", note_id))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body("file", file_name, data)))
        .expect("request")
}

/// Create a note through the API and return its id.
pub async fn create_note(router: &Router, title: &str) -> i64 {
    let (status, body) = send(
        router,
        json_request(
            "POST",
            "/notes",
            serde_json::json!({
                "userId": 1,
                "title": title,
                "content": format!("{} content", title),
                "isPinned": false
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    body["id"].as_i64().expect("id in create response")
}
