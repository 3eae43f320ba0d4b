//! # notedeck-db
//!
//! Persistence layer for notedeck.
//!
//! This crate provides:
//! - Connection pool management
//! - PostgreSQL repositories for notes and attachment metadata
//! - The object store gateway and its S3 backend for attachment blobs
//! - In-memory doubles of both stores (feature `mock`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use notedeck_db::{CreateNoteRequest, Database, NoteRepository, PoolConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/notedeck", &PoolConfig::default()).await?;
//!
//!     let note_id = db.notes.insert(CreateNoteRequest {
//!         user_id: 1,
//!         title: "Hello".to_string(),
//!         content: "world".to_string(),
//!         is_pinned: false,
//!     }).await?;
//!
//!     println!("Created note: {}", note_id);
//!     Ok(())
//! }
//! ```
pub mod attachments;
#[cfg(any(test, feature = "mock"))]
pub mod memory;
pub mod notes;
pub mod object_store;
pub mod pool;
pub mod s3;

// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use notedeck_core::*;

pub use attachments::PgAttachmentRepository;
#[cfg(any(test, feature = "mock"))]
pub use memory::{MemoryBackend, MemoryDatabase};
pub use notes::PgNoteRepository;
pub use object_store::{ObjectStoreGateway, StorageBackend, DEFAULT_BUCKET, DEFAULT_URL_TTL};
pub use pool::{create_pool, PoolConfig};
pub use s3::{S3Backend, S3Config};

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Note repository for CRUD operations.
    pub notes: PgNoteRepository,
    /// Attachment metadata repository.
    pub attachments: PgAttachmentRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notes: PgNoteRepository::new(pool.clone()),
            attachments: PgAttachmentRepository::new(pool.clone()),
            pool,
        }
    }

    /// Open a pool against `url` and build both repositories on it.
    pub async fn connect(url: &str, config: &PoolConfig) -> Result<Self> {
        let pool = create_pool(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
