//! In-memory repositories and object store backend.
//!
//! Used by tests across the workspace (enable the `mock` feature). Both
//! doubles can be told to fail specific operations so error paths can be
//! exercised without PostgreSQL or MinIO.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use notedeck_core::{
    Attachment, AttachmentRepository, CreateAttachmentRequest, CreateNoteRequest, Error, Note,
    NoteRepository, Result, UpdateNoteRequest,
};

use crate::object_store::StorageBackend;

const URL_SCHEME: &str = "memory://";

// =============================================================================
// OBJECT STORE
// =============================================================================

#[derive(Default)]
struct BackendState {
    buckets: HashSet<String>,
    objects: HashMap<(String, String), Vec<u8>>,
}

/// Object store backend held entirely in memory.
///
/// Presigned URLs look like `memory://{bucket}/{key}?expires_in={secs}` and
/// can be resolved with [`MemoryBackend::fetch_url`].
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<BackendState>,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
    ignore_deletes: AtomicBool,
    bucket_creations: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every `put_object` fail.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make every `delete_object` fail.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Make `delete_object` report success without removing anything.
    pub fn ignore_deletes(&self, ignore: bool) {
        self.ignore_deletes.store(ignore, Ordering::SeqCst);
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.lock().buckets.contains(bucket)
    }

    /// Number of times a bucket was actually created.
    pub fn bucket_creations(&self) -> usize {
        self.bucket_creations.load(Ordering::SeqCst)
    }

    /// Sorted keys currently stored in `bucket`.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .lock()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Resolve a URL produced by `presign_get` to the stored bytes.
    pub fn fetch_url(&self, url: &str) -> Option<Vec<u8>> {
        let rest = url.strip_prefix(URL_SCHEME)?;
        let path = rest.split('?').next()?;
        let (bucket, key) = path.split_once('/')?;
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.has_bucket(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        if self.lock().buckets.insert(bucket.to_string()) {
            self.bucket_creations.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Error::ObjectStore(format!("put_object {}: injected failure", key)));
        }
        let mut state = self.lock();
        if !state.buckets.contains(bucket) {
            return Err(Error::ObjectStore(format!("NoSuchBucket: {}", bucket)));
        }
        state
            .objects
            .insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("object {}/{}", bucket, key)))
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self
            .lock()
            .objects
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::ObjectStore(format!(
                "delete_object {}: injected failure",
                key
            )));
        }
        if self.ignore_deletes.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.lock()
            .objects
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn presign_get(&self, bucket: &str, key: &str, expires_in: Duration) -> Result<String> {
        Ok(format!(
            "{}{}/{}?expires_in={}",
            URL_SCHEME,
            bucket,
            key,
            expires_in.as_secs()
        ))
    }
}

// =============================================================================
// RELATIONAL STORE
// =============================================================================

#[derive(Default)]
struct DbState {
    notes: BTreeMap<i64, Note>,
    files: BTreeMap<i64, Attachment>,
    last_note_id: i64,
    last_file_id: i64,
}

/// In-memory stand-in for PostgreSQL implementing both repository traits.
///
/// Every operation runs under one lock, so the two-step note delete is as
/// atomic here as it is inside a database transaction.
#[derive(Default)]
pub struct MemoryDatabase {
    state: Mutex<DbState>,
    fail_note_deletes: AtomicBool,
    fail_attachment_inserts: AtomicBool,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DbState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make note deletion fail before anything is removed.
    pub fn fail_note_deletes(&self, fail: bool) {
        self.fail_note_deletes.store(fail, Ordering::SeqCst);
    }

    /// Make attachment row inserts fail.
    pub fn fail_attachment_inserts(&self, fail: bool) {
        self.fail_attachment_inserts.store(fail, Ordering::SeqCst);
    }

    /// Number of attachment rows referencing `note_id`.
    pub fn attachment_count(&self, note_id: i64) -> usize {
        self.lock()
            .files
            .values()
            .filter(|f| f.note_id == note_id)
            .count()
    }

    fn has_file_named(state: &DbState, note_id: i64, file_name: &str, extension: &str) -> bool {
        state
            .files
            .values()
            .any(|f| f.note_id == note_id && f.file_name == file_name && f.extension == extension)
    }

    fn with_attachments(state: &DbState, note: &Note) -> Note {
        let mut note = note.clone();
        note.attachments = state
            .files
            .values()
            .filter(|f| f.note_id == note.id)
            .cloned()
            .collect();
        note
    }
}

#[async_trait]
impl NoteRepository for MemoryDatabase {
    async fn list(&self) -> Result<Vec<Note>> {
        let state = self.lock();
        Ok(state
            .notes
            .values()
            .map(|n| Self::with_attachments(&state, n))
            .collect())
    }

    async fn fetch(&self, id: i64) -> Result<Note> {
        let state = self.lock();
        state
            .notes
            .get(&id)
            .map(|n| Self::with_attachments(&state, n))
            .ok_or(Error::NoteNotFound(id))
    }

    async fn insert(&self, req: CreateNoteRequest) -> Result<i64> {
        let mut state = self.lock();
        state.last_note_id += 1;
        let id = state.last_note_id;
        state.notes.insert(
            id,
            Note {
                id,
                user_id: req.user_id,
                title: req.title,
                content: req.content,
                last_modified: Utc::now(),
                is_pinned: req.is_pinned,
                attachments: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn update(&self, id: i64, req: UpdateNoteRequest) -> Result<bool> {
        let mut state = self.lock();
        let Some(note) = state.notes.get_mut(&id) else {
            return Ok(false);
        };
        note.title = req.title;
        note.content = req.content;
        if let Some(pinned) = req.is_pinned {
            note.is_pinned = pinned;
        }
        note.last_modified = Utc::now();
        Ok(true)
    }

    async fn set_pinned(&self, id: i64, is_pinned: bool) -> Result<bool> {
        let mut state = self.lock();
        match state.notes.get_mut(&id) {
            Some(note) => {
                note.is_pinned = is_pinned;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        if self.fail_note_deletes.load(Ordering::SeqCst) {
            return Err(Error::Internal(format!(
                "delete of note {} failed: injected failure",
                id
            )));
        }
        let mut state = self.lock();
        state.files.retain(|_, f| f.note_id != id);
        Ok(state.notes.remove(&id).is_some())
    }

    async fn exists(&self, id: i64) -> Result<bool> {
        Ok(self.lock().notes.contains_key(&id))
    }
}

#[async_trait]
impl AttachmentRepository for MemoryDatabase {
    async fn insert(&self, req: CreateAttachmentRequest) -> Result<i64> {
        if self.fail_attachment_inserts.load(Ordering::SeqCst) {
            return Err(Error::Internal(
                "insert into note_files failed: injected failure".to_string(),
            ));
        }
        let mut state = self.lock();
        if !state.notes.contains_key(&req.note_id) {
            return Err(Error::Internal(format!(
                "foreign key violation: note {} does not exist",
                req.note_id
            )));
        }
        if Self::has_file_named(&state, req.note_id, &req.file_name, &req.extension) {
            return Err(Error::Conflict(format!(
                "duplicate key on note_files: note {} already has {}.{}",
                req.note_id, req.file_name, req.extension
            )));
        }
        state.last_file_id += 1;
        let id = state.last_file_id;
        state.files.insert(
            id,
            Attachment {
                id,
                note_id: req.note_id,
                file_name: req.file_name,
                size: req.size,
                extension: req.extension,
                url: req.url,
            },
        );
        Ok(id)
    }

    async fn list_by_note(&self, note_id: i64) -> Result<Vec<Attachment>> {
        Ok(self
            .lock()
            .files
            .values()
            .filter(|f| f.note_id == note_id)
            .cloned()
            .collect())
    }

    async fn exists_by_name(&self, note_id: i64, file_name: &str, extension: &str) -> Result<bool> {
        Ok(Self::has_file_named(&self.lock(), note_id, file_name, extension))
    }

    async fn get(&self, id: i64, note_id: i64) -> Result<Attachment> {
        self.lock()
            .files
            .get(&id)
            .filter(|f| f.note_id == note_id)
            .cloned()
            .ok_or(Error::AttachmentNotFound {
                attachment_id: id,
                note_id,
            })
    }

    async fn delete(&self, id: i64, note_id: i64) -> Result<bool> {
        let mut state = self.lock();
        match state.files.get(&id) {
            Some(f) if f.note_id == note_id => {
                state.files.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
