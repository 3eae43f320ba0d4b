//! Note repository implementation.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row, Transaction};
use tracing::debug;

use notedeck_core::{
    CreateNoteRequest, Error, Note, NoteRepository, Result, UpdateNoteRequest,
};

use crate::attachments::{attachments_by_note, PgAttachmentRepository};

const NOTE_COLUMNS: &str = "id, user_id, title, content, last_modified, is_pin";

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Map a `notes` row to a Note with no attachments loaded yet.
fn note_from_row(row: &PgRow) -> Note {
    Note {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        content: row.get("content"),
        last_modified: row.get("last_modified"),
        is_pinned: row.get("is_pin"),
        attachments: Vec::new(),
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn list(&self) -> Result<Vec<Note>> {
        let sql = format!("SELECT {} FROM notes ORDER BY id", NOTE_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let mut notes: Vec<Note> = rows.iter().map(note_from_row).collect();
        let ids: Vec<i64> = notes.iter().map(|n| n.id).collect();

        // One query for every note's attachments instead of one per note.
        let mut by_note = attachments_by_note(&self.pool, &ids).await?;
        for note in &mut notes {
            note.attachments = by_note.remove(&note.id).unwrap_or_default();
        }

        debug!(
            subsystem = "database",
            component = "notes",
            op = "list",
            result_count = notes.len(),
            "Listed notes"
        );
        Ok(notes)
    }

    async fn fetch(&self, id: i64) -> Result<Note> {
        let sql = format!("SELECT {} FROM notes WHERE id = $1", NOTE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::NoteNotFound(id))?;

        let mut note = note_from_row(&row);
        note.attachments = attachments_by_note(&self.pool, &[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(note)
    }

    async fn insert(&self, req: CreateNoteRequest) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO notes (user_id, title, content, last_modified, is_pin)
             VALUES ($1, $2, $3, NOW(), $4)
             RETURNING id",
        )
        .bind(req.user_id)
        .bind(&req.title)
        .bind(&req.content)
        .bind(req.is_pinned)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "insert",
            note_id = id,
            user_id = req.user_id,
            "Inserted note"
        );
        Ok(id)
    }

    async fn update(&self, id: i64, req: UpdateNoteRequest) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE notes
             SET title = $1, content = $2, is_pin = COALESCE($3, is_pin), last_modified = NOW()
             WHERE id = $4",
        )
        .bind(&req.title)
        .bind(&req.content)
        .bind(req.is_pinned)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_pinned(&self, id: i64, is_pinned: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE notes SET is_pin = $1 WHERE id = $2")
            .bind(is_pinned)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let removed_files = self.delete_attachments_tx(&mut tx, id).await?;
        let existed = self.delete_note_tx(&mut tx, id).await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "delete",
            note_id = id,
            removed_files,
            existed,
            "Deleted note"
        );
        Ok(existed)
    }

    async fn exists(&self, id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM notes WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(exists)
    }
}

// =============================================================================
// TRANSACTION-AWARE VARIANTS
// =============================================================================

/// Building blocks of [`NoteRepository::delete`].
///
/// Exposed so callers can compose them inside their own transaction; nothing
/// is visible to other connections until the caller commits.
impl PgNoteRepository {
    /// Delete every attachment row of a note. Returns the number of rows removed.
    pub async fn delete_attachments_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: i64,
    ) -> Result<u64> {
        PgAttachmentRepository::delete_by_note_tx(tx, note_id).await
    }

    /// Delete the note row itself. Returns `false` if it did not exist.
    pub async fn delete_note_tx(&self, tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
