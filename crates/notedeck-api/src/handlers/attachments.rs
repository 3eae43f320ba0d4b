//! Attachment HTTP handlers.

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
        Multipart, Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::debug;
use utoipa::ToSchema;

use notedeck_core::Attachment;

use crate::{ApiError, AppState};

/// Multipart form field carrying the file.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileBody {
    pub attachment_id: i64,
}

/// Multipart upload form.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Upload a file and attach it to a note.
#[utoipa::path(
    post,
    path = "/notes/{id}/upload-file",
    tag = "Attachments",
    params(("id" = i64, Path, description = "Note id")),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Attachment stored", body = Attachment),
        (status = 400, description = "Missing or malformed file part"),
        (status = 404, description = "No such note"),
        (status = 409, description = "Note already has an attachment with this name"),
        (status = 413, description = "File exceeds the upload limit")
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Attachment>), ApiError> {
    let Path(note_id) = id?;
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("file part has no filename".to_string()))?;
        let data = field.bytes().await?;

        debug!(
            subsystem = "api",
            component = "attachments",
            note_id,
            file_name = %file_name,
            size = data.len(),
            "Received upload"
        );

        let attachment = state
            .attachments
            .upload(note_id, &file_name, data.to_vec())
            .await?;
        return Ok((StatusCode::CREATED, Json(attachment)));
    }

    Err(ApiError::BadRequest(format!(
        "missing multipart field '{}'",
        FILE_FIELD
    )))
}

/// Delete one attachment of a note.
#[utoipa::path(
    delete,
    path = "/notes/{id}/delete-file",
    tag = "Attachments",
    params(("id" = i64, Path, description = "Note id")),
    request_body = DeleteFileBody,
    responses(
        (status = 200, description = "Attachment deleted"),
        (status = 400, description = "Malformed body"),
        (status = 404, description = "No such attachment on this note")
    )
)]
pub async fn delete_file(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<DeleteFileBody>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(note_id) = id?;
    let Json(body) = body?;
    state
        .attachments
        .delete(note_id, body.attachment_id)
        .await?;
    Ok(StatusCode::OK)
}
