//! Note HTTP handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use notedeck_core::{CreateNoteRequest, Note, UpdateNoteRequest};

use crate::{ApiError, AppState};

/// Request body for creating a note.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteBody {
    pub user_id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_pinned: bool,
}

/// Request body for overwriting a note. Omitting `isPinned` keeps the flag.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteBody {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_pinned: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TogglePinBody {
    pub is_pinned: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedNote {
    pub id: i64,
}

/// List every note with its attachments.
#[utoipa::path(
    get,
    path = "/notes",
    tag = "Notes",
    responses((status = 200, description = "All notes", body = [Note]))
)]
pub async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<Note>>, ApiError> {
    Ok(Json(state.notes.list().await?))
}

/// Get a note by id.
#[utoipa::path(
    get,
    path = "/notes/{id}",
    tag = "Notes",
    params(("id" = i64, Path, description = "Note id")),
    responses(
        (status = 200, description = "The note", body = Note),
        (status = 404, description = "No such note")
    )
)]
pub async fn get_note(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Note>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.notes.get(id).await?))
}

/// Create a note.
#[utoipa::path(
    post,
    path = "/notes",
    tag = "Notes",
    request_body = CreateNoteBody,
    responses(
        (status = 201, description = "Note created", body = CreatedNote),
        (status = 400, description = "Malformed body")
    )
)]
pub async fn create_note(
    State(state): State<AppState>,
    body: Result<Json<CreateNoteBody>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedNote>), ApiError> {
    let Json(body) = body?;
    let id = state
        .notes
        .create(CreateNoteRequest {
            user_id: body.user_id,
            title: body.title,
            content: body.content,
            is_pinned: body.is_pinned,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedNote { id })))
}

/// Overwrite a note's title and content.
#[utoipa::path(
    put,
    path = "/notes/{id}",
    tag = "Notes",
    params(("id" = i64, Path, description = "Note id")),
    request_body = UpdateNoteBody,
    responses(
        (status = 200, description = "Note updated"),
        (status = 400, description = "Malformed body"),
        (status = 404, description = "No such note")
    )
)]
pub async fn update_note(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateNoteBody>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;
    state
        .notes
        .update(
            id,
            UpdateNoteRequest {
                title: body.title,
                content: body.content,
                is_pinned: body.is_pinned,
            },
        )
        .await?;
    Ok(StatusCode::OK)
}

/// Delete a note, its attachment rows, and (best effort) their blobs.
#[utoipa::path(
    delete,
    path = "/notes/{id}",
    tag = "Notes",
    params(("id" = i64, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note deleted"),
        (status = 404, description = "No such note")
    )
)]
pub async fn delete_note(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.notes.delete(id).await?;
    Ok(StatusCode::OK)
}

/// Set the pin flag of a note.
#[utoipa::path(
    put,
    path = "/notes/{id}/toggle-pin",
    tag = "Notes",
    params(("id" = i64, Path, description = "Note id")),
    request_body = TogglePinBody,
    responses(
        (status = 200, description = "Pin flag set"),
        (status = 400, description = "Malformed body"),
        (status = 404, description = "No such note")
    )
)]
pub async fn toggle_pin(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<TogglePinBody>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;
    state.notes.set_pinned(id, body.is_pinned).await?;
    Ok(StatusCode::OK)
}
