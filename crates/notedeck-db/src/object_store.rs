//! Object store gateway for attachment blobs.
//!
//! [`ObjectStoreGateway`] owns the bucket name and URL lifetime and adds the
//! checks the services rely on (bucket auto-provisioning, verified deletes)
//! on top of a pluggable [`StorageBackend`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use notedeck_db::{ObjectStoreGateway, S3Backend, S3Config};
//!
//! let backend = S3Backend::new(&S3Config::from_parts("http://localhost:9000", "minio", "minio123"));
//! let gateway = ObjectStoreGateway::new(backend, "notes-files", Duration::from_secs(604_800));
//!
//! let url = gateway.put("42-report.pdf", bytes).await?;
//! gateway.delete("42-report.pdf").await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use notedeck_core::{Error, Result};

/// Seven days, the longest lifetime S3 accepts for a presigned URL.
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default bucket holding attachment blobs.
pub const DEFAULT_BUCKET: &str = "notes-files";

/// Storage backend trait for different object store implementations.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Check whether the bucket exists.
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Create the bucket. Creating a bucket that already exists must succeed.
    async fn create_bucket(&self, bucket: &str) -> Result<()>;

    /// Write an object, replacing any previous content under the key.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;

    /// Read an object. Returns `Error::NotFound` if absent.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Check if an object exists.
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool>;

    /// Remove an object.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Build a URL that grants read access to the object for `expires_in`.
    async fn presign_get(&self, bucket: &str, key: &str, expires_in: Duration) -> Result<String>;
}

/// Blob persistence for attachments, scoped to one bucket.
#[derive(Clone)]
pub struct ObjectStoreGateway {
    backend: Arc<dyn StorageBackend>,
    bucket: String,
    url_ttl: Duration,
    bucket_ready: Arc<AtomicBool>,
}

impl ObjectStoreGateway {
    pub fn new(
        backend: impl StorageBackend + 'static,
        bucket: impl Into<String>,
        url_ttl: Duration,
    ) -> Self {
        Self::from_arc(Arc::new(backend), bucket, url_ttl)
    }

    /// Build a gateway over a backend the caller keeps a handle to.
    pub fn from_arc(
        backend: Arc<dyn StorageBackend>,
        bucket: impl Into<String>,
        url_ttl: Duration,
    ) -> Self {
        Self {
            backend,
            bucket: bucket.into(),
            url_ttl,
            bucket_ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn url_ttl(&self) -> Duration {
        self.url_ttl
    }

    /// Create the bucket if it does not exist yet.
    ///
    /// Idempotent. After the first success the check is skipped for the
    /// life of this gateway (and its clones).
    pub async fn ensure_bucket(&self) -> Result<()> {
        if self.bucket_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        if !self.backend.bucket_exists(&self.bucket).await? {
            info!(
                subsystem = "storage",
                component = "gateway",
                op = "create_bucket",
                bucket = %self.bucket,
                "Bucket missing, creating it"
            );
            self.backend.create_bucket(&self.bucket).await?;
        }

        self.bucket_ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Store `data` under `key` and return a presigned retrieval URL.
    pub async fn put(&self, key: &str, data: Vec<u8>) -> Result<String> {
        self.ensure_bucket().await?;

        let size = data.len();
        debug!(
            subsystem = "storage",
            component = "gateway",
            op = "put",
            bucket = %self.bucket,
            key,
            size,
            "Uploading object"
        );
        self.backend
            .put_object(&self.bucket, key, data, "application/octet-stream")
            .await?;

        self.presign(key).await
    }

    /// Read the bytes stored under `key`.
    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.backend.get_object(&self.bucket, key).await
    }

    /// Mint a fresh retrieval URL for `key`.
    pub async fn presign(&self, key: &str) -> Result<String> {
        self.backend
            .presign_get(&self.bucket, key, self.url_ttl)
            .await
    }

    /// Delete the object under `key`, verifying it existed and is gone afterwards.
    ///
    /// Fails with `Error::ObjectMissing` if there was nothing to delete and
    /// with `Error::ObjectStillPresent` if the object survived the delete.
    pub async fn delete(&self, key: &str) -> Result<()> {
        debug!(
            subsystem = "storage",
            component = "gateway",
            op = "delete",
            bucket = %self.bucket,
            key,
            "Deleting object"
        );

        if !self.backend.object_exists(&self.bucket, key).await? {
            warn!(
                subsystem = "storage",
                component = "gateway",
                bucket = %self.bucket,
                key,
                "Object to delete does not exist"
            );
            return Err(Error::ObjectMissing(key.to_string()));
        }

        self.backend.delete_object(&self.bucket, key).await?;

        if self.backend.object_exists(&self.bucket, key).await? {
            return Err(Error::ObjectStillPresent(key.to_string()));
        }

        debug!(
            subsystem = "storage",
            component = "gateway",
            key,
            "Object deleted"
        );
        Ok(())
    }
}
