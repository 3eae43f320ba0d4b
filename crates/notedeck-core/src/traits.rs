//! Repository traits.
//!
//! The services in `notedeck-api` only see these traits, so PostgreSQL and
//! the in-memory doubles used in tests are interchangeable.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// NOTE REPOSITORY
// =============================================================================

/// Repository for note CRUD operations.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// All notes, each with its attachments.
    async fn list(&self) -> Result<Vec<Note>>;

    /// Fetch one note with its attachments.
    ///
    /// Returns `Error::NoteNotFound` if no row matches.
    async fn fetch(&self, id: i64) -> Result<Note>;

    /// Insert a new note and return its id.
    async fn insert(&self, req: CreateNoteRequest) -> Result<i64>;

    /// Overwrite title/content (and optionally the pin flag).
    ///
    /// Returns `false` when no note has this id.
    async fn update(&self, id: i64, req: UpdateNoteRequest) -> Result<bool>;

    /// Update only the pin flag. Returns `false` when no note has this id.
    async fn set_pinned(&self, id: i64, is_pinned: bool) -> Result<bool>;

    /// Delete a note's attachment rows and then the note row, atomically.
    ///
    /// Returns `false` when no note had this id.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Check if a note exists.
    async fn exists(&self, id: i64) -> Result<bool>;
}

// =============================================================================
// ATTACHMENT REPOSITORY
// =============================================================================

/// Repository for attachment metadata rows.
#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    /// Insert an attachment row and return its id.
    ///
    /// Returns `Error::Conflict` if the note already has an attachment with
    /// the same name and extension.
    async fn insert(&self, req: CreateAttachmentRequest) -> Result<i64>;

    /// Attachments belonging to a note.
    async fn list_by_note(&self, note_id: i64) -> Result<Vec<Attachment>>;

    /// Whether the note already has an attachment with this name and extension.
    async fn exists_by_name(&self, note_id: i64, file_name: &str, extension: &str) -> Result<bool>;

    /// Fetch one attachment, scoped to its note.
    ///
    /// Returns `Error::AttachmentNotFound` if the pair does not match.
    async fn get(&self, id: i64, note_id: i64) -> Result<Attachment>;

    /// Delete one attachment row, scoped to its note.
    ///
    /// Returns `false` if nothing matched.
    async fn delete(&self, id: i64, note_id: i64) -> Result<bool>;
}
