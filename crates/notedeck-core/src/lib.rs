//! # notedeck-core
//!
//! Core types, traits, and errors shared by the notedeck crates.

pub mod error;
pub mod file_names;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use file_names::{object_key, sanitize_file_name, split_file_name};
pub use models::*;
pub use traits::*;
