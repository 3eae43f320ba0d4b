//! Attachment upload and deletion.
//!
//! Coordinates the attachment repository with the object store. There is no
//! transaction spanning both, so the ordering is what keeps them consistent:
//!
//! - Upload refuses a name the note already holds, since the blob key is
//!   derived from it. It then writes the blob first and the row second. A
//!   failed row insert leaves an orphaned blob, which is logged.
//! - Delete removes the blob first and the row only after that succeeded,
//!   so a row never points at a blob that was deleted without it.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, warn};

use notedeck_core::{
    object_key, sanitize_file_name, split_file_name, Attachment, AttachmentRepository,
    CreateAttachmentRequest, Error, NoteRepository, Result,
};
use notedeck_db::ObjectStoreGateway;

#[derive(Clone)]
pub struct AttachmentService {
    attachments: Arc<dyn AttachmentRepository>,
    notes: Arc<dyn NoteRepository>,
    store: ObjectStoreGateway,
}

impl AttachmentService {
    pub fn new(
        attachments: Arc<dyn AttachmentRepository>,
        notes: Arc<dyn NoteRepository>,
        store: ObjectStoreGateway,
    ) -> Self {
        Self {
            attachments,
            notes,
            store,
        }
    }

    pub fn store(&self) -> &ObjectStoreGateway {
        &self.store
    }

    /// Store `data` as an attachment of `note_id` and record its metadata.
    pub async fn upload(&self, note_id: i64, raw_file_name: &str, data: Vec<u8>) -> Result<Attachment> {
        if !self.notes.exists(note_id).await? {
            return Err(Error::NoteNotFound(note_id));
        }

        let file_name = sanitize_file_name(raw_file_name)?;
        let (base_name, extension) = split_file_name(&file_name);
        let key = object_key(note_id, &base_name, &extension);
        let size = data.len() as i64;

        if self
            .attachments
            .exists_by_name(note_id, &base_name, &extension)
            .await?
        {
            return Err(Error::Conflict(format!(
                "note {} already has an attachment named {}",
                note_id, file_name
            )));
        }

        let url = self.store.put(&key, data).await?;

        let req = CreateAttachmentRequest {
            note_id,
            file_name: base_name,
            extension,
            size,
            url,
        };
        let id = match self.attachments.insert(req.clone()).await {
            Ok(id) => id,
            // A concurrent upload of the same name won the row; the blob is its.
            Err(e @ Error::Conflict(_)) => return Err(e),
            Err(e) => {
                error!(
                    subsystem = "attachments",
                    op = "upload",
                    note_id,
                    key = %key,
                    error = %e,
                    "Metadata insert failed, blob left orphaned in object store"
                );
                return Err(e);
            }
        };

        info!(
            subsystem = "attachments",
            op = "upload",
            note_id,
            attachment_id = id,
            key = %key,
            size,
            "Attachment stored"
        );

        Ok(Attachment {
            id,
            note_id,
            file_name: req.file_name,
            size,
            extension: req.extension,
            url: req.url,
        })
    }

    /// Delete one attachment: blob first, then the row.
    pub async fn delete(&self, note_id: i64, attachment_id: i64) -> Result<()> {
        let attachment = self.attachments.get(attachment_id, note_id).await?;
        let key = attachment.object_key();

        self.store.delete(&key).await?;

        if !self.attachments.delete(attachment_id, note_id).await? {
            // Removed concurrently between the lookup and here.
            warn!(
                subsystem = "attachments",
                op = "delete",
                note_id,
                attachment_id,
                "Attachment row already gone"
            );
        }

        info!(
            subsystem = "attachments",
            op = "delete",
            note_id,
            attachment_id,
            key = %key,
            "Attachment deleted"
        );
        Ok(())
    }

    /// Delete the blobs of every attachment of a note, concurrently.
    ///
    /// Failures are logged and skipped. Returns how many blobs were removed.
    /// Rows are left alone; the caller deletes them with the note.
    pub async fn purge_note(&self, note_id: i64) -> Result<usize> {
        let attachments = self.attachments.list_by_note(note_id).await?;
        if attachments.is_empty() {
            return Ok(0);
        }

        let keys: Vec<String> = attachments.iter().map(Attachment::object_key).collect();
        let results = join_all(keys.iter().map(|key| self.store.delete(key))).await;

        let mut removed = 0;
        for (key, result) in keys.iter().zip(results) {
            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!(
                    subsystem = "attachments",
                    op = "purge",
                    note_id,
                    key = %key,
                    error = %e,
                    "Could not delete attachment blob, continuing"
                ),
            }
        }

        info!(
            subsystem = "attachments",
            op = "purge",
            note_id,
            removed,
            total = keys.len(),
            "Purged attachment blobs"
        );
        Ok(removed)
    }
}
