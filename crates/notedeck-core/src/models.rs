//! Core data models for notedeck.
//!
//! Field names on the wire are camelCase to match the existing web client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A user-owned text record together with its attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub last_modified: DateTime<Utc>,
    pub is_pinned: bool,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Fields needed to create a note. `last_modified` is always set by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateNoteRequest {
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub is_pinned: bool,
}

/// Full overwrite of a note's editable fields.
///
/// `is_pinned: None` leaves the stored flag as it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNoteRequest {
    pub title: String,
    pub content: String,
    pub is_pinned: Option<bool>,
}

// =============================================================================
// ATTACHMENT TYPES
// =============================================================================

/// Metadata of a file stored in the object store on behalf of a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: i64,
    pub note_id: i64,
    /// Base name without extension.
    #[serde(rename = "filename")]
    pub file_name: String,
    /// Size in bytes.
    pub size: i64,
    /// Extension without the leading dot; empty when the file had none.
    pub extension: String,
    /// Presigned retrieval URL. Expires; see `ATTACHMENT_URL_TTL_SECS`.
    pub url: String,
}

impl Attachment {
    /// Object-store key backing this attachment.
    pub fn object_key(&self) -> String {
        crate::file_names::object_key(self.note_id, &self.file_name, &self.extension)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAttachmentRequest {
    pub note_id: i64,
    pub file_name: String,
    pub extension: String,
    pub size: i64,
    pub url: String,
}
