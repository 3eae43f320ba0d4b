//! Note endpoints end to end over in-memory stores.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{create_note, empty_request, json_request, send, test_app, test_app_with_policy};
use notedeck_api::MissingNotePolicy;

#[tokio::test]
async fn test_create_then_get_returns_same_fields() {
    let app = test_app();
    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/notes",
            json!({"userId": 7, "title": "Groceries", "content": "milk", "isPinned": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().unwrap();

    let (status, note) = send(&app.router, empty_request("GET", &format!("/notes/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(note["id"], id);
    assert_eq!(note["userId"], 7);
    assert_eq!(note["title"], "Groceries");
    assert_eq!(note["content"], "milk");
    assert_eq!(note["isPinned"], true);
    assert_eq!(note["attachments"], json!([]));
    assert!(note["lastModified"].is_string());
}

#[tokio::test]
async fn test_create_defaults_is_pinned_to_false() {
    let app = test_app();
    let (status, body) = send(
        &app.router,
        json_request("POST", "/notes", json!({"userId": 1, "title": "t", "content": "c"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = body["id"].as_i64().unwrap();
    let (_, note) = send(&app.router, empty_request("GET", &format!("/notes/{}", id))).await;
    assert_eq!(note["isPinned"], false);
}

#[tokio::test]
async fn test_get_unknown_note_is_404() {
    let app = test_app();
    let (status, body) = send(&app.router, empty_request("GET", "/notes/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_list_returns_all_notes_with_attachments() {
    let app = test_app();
    create_note(&app.router, "first").await;
    create_note(&app.router, "second").await;

    let (status, body) = send(&app.router, empty_request("GET", "/notes")).await;
    assert_eq!(status, StatusCode::OK);
    let notes = body.as_array().unwrap();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|n| n["attachments"].is_array()));
}

#[tokio::test]
async fn test_list_empty_is_empty_array() {
    let app = test_app();
    let (status, body) = send(&app.router, empty_request("GET", "/notes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_malformed_create_body_is_400() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        json_request("POST", "/notes", json!({"title": "no user id"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app.router,
        json_request("POST", "/notes", json!({"userId": "seven", "title": "t", "content": "c"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_numeric_id_is_400() {
    let app = test_app();
    let (status, _) = send(&app.router, empty_request("GET", "/notes/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_overwrites_and_keeps_pin_when_omitted() {
    let app = test_app();
    let id = create_note(&app.router, "old").await;
    send(
        &app.router,
        json_request("PUT", &format!("/notes/{}/toggle-pin", id), json!({"isPinned": true})),
    )
    .await;

    let (_, before) = send(&app.router, empty_request("GET", &format!("/notes/{}", id))).await;
    let (status, _) = send(
        &app.router,
        json_request(
            "PUT",
            &format!("/notes/{}", id),
            json!({"title": "new", "content": "new content"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, after) = send(&app.router, empty_request("GET", &format!("/notes/{}", id))).await;
    assert_eq!(after["title"], "new");
    assert_eq!(after["content"], "new content");
    assert_eq!(after["isPinned"], true);

    assert!(timestamp(&after["lastModified"]) >= timestamp(&before["lastModified"]));
}

fn timestamp(value: &serde_json::Value) -> chrono::DateTime<chrono::FixedOffset> {
    chrono::DateTime::parse_from_rfc3339(value.as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_update_can_set_pin() {
    let app = test_app();
    let id = create_note(&app.router, "t").await;
    send(
        &app.router,
        json_request(
            "PUT",
            &format!("/notes/{}", id),
            json!({"title": "t", "content": "c", "isPinned": true}),
        ),
    )
    .await;
    let (_, note) = send(&app.router, empty_request("GET", &format!("/notes/{}", id))).await;
    assert_eq!(note["isPinned"], true);
}

#[tokio::test]
async fn test_toggle_pin_twice_restores_flag() {
    let app = test_app();
    let id = create_note(&app.router, "pin me").await;
    let uri = format!("/notes/{}/toggle-pin", id);

    let (status, _) = send(&app.router, json_request("PUT", &uri, json!({"isPinned": true}))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, note) = send(&app.router, empty_request("GET", &format!("/notes/{}", id))).await;
    assert_eq!(note["isPinned"], true);

    send(&app.router, json_request("PUT", &uri, json!({"isPinned": false}))).await;
    let (_, note) = send(&app.router, empty_request("GET", &format!("/notes/{}", id))).await;
    assert_eq!(note["isPinned"], false);
}

#[tokio::test]
async fn test_toggle_pin_malformed_body_is_400() {
    let app = test_app();
    let id = create_note(&app.router, "t").await;
    let (status, _) = send(
        &app.router,
        json_request("PUT", &format!("/notes/{}/toggle-pin", id), json!({"isPinned": "yes"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mutating_missing_note_is_404_by_default() {
    let app = test_app();
    let (status, _) = send(
        &app.router,
        json_request("PUT", "/notes/999", json!({"title": "t", "content": "c"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app.router,
        json_request("PUT", "/notes/999/toggle-pin", json!({"isPinned": true})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app.router, empty_request("DELETE", "/notes/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mutating_missing_note_succeeds_under_ignore_policy() {
    let app = test_app_with_policy(MissingNotePolicy::Ignore);
    let (status, _) = send(
        &app.router,
        json_request("PUT", "/notes/999", json!({"title": "t", "content": "c"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, empty_request("DELETE", "/notes/999")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, empty_request("GET", "/notes/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_note_then_get_is_404() {
    let app = test_app();
    let id = create_note(&app.router, "bye").await;

    let (status, _) = send(&app.router, empty_request("DELETE", &format!("/notes/{}", id))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, empty_request("GET", &format!("/notes/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_openapi() {
    let app = test_app();
    let (status, body) = send(&app.router, empty_request("GET", "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());

    let (status, doc) = send(&app.router, empty_request("GET", "/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/notes"].is_object());
    assert!(doc["paths"]["/notes/{id}/upload-file"].is_object());
}
