//! HTTP handlers for notedeck-api.

pub mod attachments;
pub mod health;
pub mod notes;

pub use attachments::{delete_file, upload_file};
pub use health::{health_check, openapi_json};
pub use notes::{create_note, delete_note, get_note, list_notes, toggle_pin, update_note};
