//! Attachment metadata repository.
//!
//! Rows live in `note_files`. Blob bytes are never stored here; see
//! [`crate::object_store`].

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Postgres, Row, Transaction};
use tracing::debug;

use notedeck_core::{Attachment, AttachmentRepository, CreateAttachmentRequest, Error, Result};

const FILE_COLUMNS: &str = "id, note_id, file_name, size, ext, file_url";

/// PostgreSQL implementation of AttachmentRepository.
#[derive(Clone)]
pub struct PgAttachmentRepository {
    pool: PgPool,
}

impl PgAttachmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete all attachment rows of a note within an existing transaction.
    pub async fn delete_by_note_tx(
        tx: &mut Transaction<'_, Postgres>,
        note_id: i64,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM note_files WHERE note_id = $1")
            .bind(note_id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}

fn attachment_from_row(row: &PgRow) -> Attachment {
    Attachment {
        id: row.get("id"),
        note_id: row.get("note_id"),
        file_name: row.get("file_name"),
        size: row.get("size"),
        extension: row.get("ext"),
        url: row.get("file_url"),
    }
}

fn display_name(file_name: &str, extension: &str) -> String {
    if extension.is_empty() {
        file_name.to_string()
    } else {
        format!("{}.{}", file_name, extension)
    }
}

/// Load the attachments of several notes with a single query, grouped by note id.
pub(crate) async fn attachments_by_note(
    pool: &PgPool,
    note_ids: &[i64],
) -> Result<HashMap<i64, Vec<Attachment>>> {
    if note_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let sql = format!(
        "SELECT {} FROM note_files WHERE note_id = ANY($1) ORDER BY id",
        FILE_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(note_ids)
        .fetch_all(pool)
        .await
        .map_err(Error::Database)?;

    let mut grouped: HashMap<i64, Vec<Attachment>> = HashMap::new();
    for row in &rows {
        let attachment = attachment_from_row(row);
        grouped.entry(attachment.note_id).or_default().push(attachment);
    }
    Ok(grouped)
}

#[async_trait]
impl AttachmentRepository for PgAttachmentRepository {
    async fn insert(&self, req: CreateAttachmentRequest) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO note_files (note_id, file_name, size, ext, file_url)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(req.note_id)
        .bind(&req.file_name)
        .bind(req.size)
        .bind(&req.extension)
        .bind(&req.url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let unique = e
                .as_database_error()
                .map_or(false, |db| db.is_unique_violation());
            if unique {
                Error::Conflict(format!(
                    "note {} already has an attachment named {}",
                    req.note_id,
                    display_name(&req.file_name, &req.extension)
                ))
            } else {
                Error::Database(e)
            }
        })?;

        debug!(
            subsystem = "database",
            component = "attachments",
            op = "insert",
            attachment_id = id,
            note_id = req.note_id,
            size = req.size,
            "Inserted attachment metadata"
        );
        Ok(id)
    }

    async fn list_by_note(&self, note_id: i64) -> Result<Vec<Attachment>> {
        Ok(attachments_by_note(&self.pool, &[note_id])
            .await?
            .remove(&note_id)
            .unwrap_or_default())
    }

    async fn exists_by_name(&self, note_id: i64, file_name: &str, extension: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM note_files WHERE note_id = $1 AND file_name = $2 AND ext = $3
             )",
        )
        .bind(note_id)
        .bind(file_name)
        .bind(extension)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(exists)
    }

    async fn get(&self, id: i64, note_id: i64) -> Result<Attachment> {
        let sql = format!(
            "SELECT {} FROM note_files WHERE id = $1 AND note_id = $2",
            FILE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(note_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::AttachmentNotFound {
                attachment_id: id,
                note_id,
            })?;
        Ok(attachment_from_row(&row))
    }

    async fn delete(&self, id: i64, note_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM note_files WHERE id = $1 AND note_id = $2")
            .bind(id)
            .bind(note_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "attachments",
            op = "delete",
            attachment_id = id,
            note_id,
            rows_affected = result.rows_affected(),
            "Deleted attachment metadata"
        );
        Ok(result.rows_affected() > 0)
    }
}
