//! Service layer for business logic.

pub mod attachments;
pub mod notes;

pub use attachments::AttachmentService;
pub use notes::NoteService;
