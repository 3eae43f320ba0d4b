//! Note CRUD on top of the note repository.

use std::sync::Arc;

use tracing::{debug, info};

use notedeck_core::{
    CreateNoteRequest, Error, Note, NoteRepository, Result, UpdateNoteRequest,
};

use crate::config::MissingNotePolicy;
use crate::services::AttachmentService;

#[derive(Clone)]
pub struct NoteService {
    notes: Arc<dyn NoteRepository>,
    attachments: AttachmentService,
    missing_note_policy: MissingNotePolicy,
}

impl NoteService {
    pub fn new(
        notes: Arc<dyn NoteRepository>,
        attachments: AttachmentService,
        missing_note_policy: MissingNotePolicy,
    ) -> Self {
        Self {
            notes,
            attachments,
            missing_note_policy,
        }
    }

    pub async fn list(&self) -> Result<Vec<Note>> {
        self.notes.list().await
    }

    pub async fn get(&self, id: i64) -> Result<Note> {
        self.notes.fetch(id).await
    }

    pub async fn create(&self, req: CreateNoteRequest) -> Result<i64> {
        let user_id = req.user_id;
        let id = self.notes.insert(req).await?;
        info!(subsystem = "notes", op = "create", note_id = id, user_id, "Note created");
        Ok(id)
    }

    pub async fn update(&self, id: i64, req: UpdateNoteRequest) -> Result<()> {
        let matched = self.notes.update(id, req).await?;
        self.check_matched(id, matched, "update")
    }

    pub async fn set_pinned(&self, id: i64, is_pinned: bool) -> Result<()> {
        let matched = self.notes.set_pinned(id, is_pinned).await?;
        self.check_matched(id, matched, "toggle_pin")
    }

    /// Purge the note's attachment blobs (best effort), then delete its rows.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.attachments.purge_note(id).await?;
        let existed = self.notes.delete(id).await?;
        if existed {
            info!(subsystem = "notes", op = "delete", note_id = id, "Note deleted");
        }
        self.check_matched(id, existed, "delete")
    }

    fn check_matched(&self, id: i64, matched: bool, op: &'static str) -> Result<()> {
        if matched {
            return Ok(());
        }
        match self.missing_note_policy {
            MissingNotePolicy::NotFound => Err(Error::NoteNotFound(id)),
            MissingNotePolicy::Ignore => {
                debug!(subsystem = "notes", op, note_id = id, "No such note, ignoring");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notedeck_db::{MemoryBackend, MemoryDatabase, ObjectStoreGateway, DEFAULT_URL_TTL};

    fn service(policy: MissingNotePolicy) -> (Arc<MemoryDatabase>, Arc<MemoryBackend>, NoteService) {
        let db = Arc::new(MemoryDatabase::new());
        let backend = Arc::new(MemoryBackend::new());
        let store = ObjectStoreGateway::from_arc(backend.clone(), "notes-files", DEFAULT_URL_TTL);
        let attachments = AttachmentService::new(db.clone(), db.clone(), store);
        (db.clone(), backend, NoteService::new(db, attachments, policy))
    }

    fn create_req() -> CreateNoteRequest {
        CreateNoteRequest {
            user_id: 5,
            title: "title".to_string(),
            content: "content".to_string(),
            is_pinned: false,
        }
    }

    fn update_req() -> UpdateNoteRequest {
        UpdateNoteRequest {
            title: "new".to_string(),
            content: "new".to_string(),
            is_pinned: None,
        }
    }

    #[tokio::test]
    async fn test_missing_note_is_not_found_by_default() {
        let (_, _, notes) = service(MissingNotePolicy::NotFound);
        assert!(matches!(
            notes.update(9, update_req()).await,
            Err(Error::NoteNotFound(9))
        ));
        assert!(matches!(
            notes.set_pinned(9, true).await,
            Err(Error::NoteNotFound(9))
        ));
        assert!(matches!(notes.delete(9).await, Err(Error::NoteNotFound(9))));
    }

    #[tokio::test]
    async fn test_missing_note_ignored_under_ignore_policy() {
        let (_, _, notes) = service(MissingNotePolicy::Ignore);
        notes.update(9, update_req()).await.unwrap();
        notes.set_pinned(9, true).await.unwrap();
        notes.delete(9).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_purges_blobs_and_rows() {
        let (db, backend, notes) = service(MissingNotePolicy::NotFound);
        let id = notes.create(create_req()).await.unwrap();
        for name in ["a.txt", "b.txt"] {
            notes
                .attachments
                .upload(id, name, b"x".to_vec())
                .await
                .unwrap();
        }

        notes.delete(id).await.unwrap();
        assert_eq!(db.attachment_count(id), 0);
        assert!(backend.keys("notes-files").is_empty());
        assert!(notes.get(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_proceeds_when_blob_deletes_fail() {
        let (db, backend, notes) = service(MissingNotePolicy::NotFound);
        let id = notes.create(create_req()).await.unwrap();
        notes
            .attachments
            .upload(id, "a.txt", b"x".to_vec())
            .await
            .unwrap();
        backend.fail_deletes(true);

        notes.delete(id).await.unwrap();
        assert_eq!(db.attachment_count(id), 0);
        assert_eq!(backend.keys("notes-files").len(), 1);
    }

    #[tokio::test]
    async fn test_failed_row_delete_keeps_note_and_attachments() {
        let (db, _, notes) = service(MissingNotePolicy::NotFound);
        let id = notes.create(create_req()).await.unwrap();
        notes
            .attachments
            .upload(id, "a.txt", b"x".to_vec())
            .await
            .unwrap();
        db.fail_note_deletes(true);

        assert!(notes.delete(id).await.is_err());
        assert_eq!(notes.get(id).await.unwrap().attachments.len(), 1);
    }
}
