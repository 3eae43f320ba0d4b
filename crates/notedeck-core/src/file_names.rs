//! Attachment file names and object-store keys.
//!
//! Every code path that touches the object store derives keys through
//! [`object_key`], so upload and delete can never disagree about where a
//! blob lives.

use crate::error::{Error, Result};

/// Strip any directory components a client sent along with the file name.
///
/// Both `/` and `\` are treated as separators since browsers on Windows
/// occasionally send full paths.
pub fn sanitize_file_name(raw: &str) -> Result<String> {
    let name = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(raw).trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::InvalidInput(format!(
            "invalid file name: {:?}",
            raw
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::InvalidInput(
            "file name contains control characters".to_string(),
        ));
    }

    Ok(name.to_string())
}

/// Split a file name into `(base_name, extension)`.
///
/// The extension is whatever follows the last `.`, without the dot. A name
/// without a dot has an empty extension. A leading-dot name such as
/// `.env` yields an empty base name and extension `env`.
pub fn split_file_name(file_name: &str) -> (String, String) {
    match file_name.rfind('.') {
        Some(idx) => (
            file_name[..idx].to_string(),
            file_name[idx + 1..].to_string(),
        ),
        None => (file_name.to_string(), String::new()),
    }
}

/// Object-store key for an attachment.
///
/// Format: `{note_id}-{file_name}.{extension}`, or `{note_id}-{file_name}`
/// when there is no extension.
pub fn object_key(note_id: i64, file_name: &str, extension: &str) -> String {
    if extension.is_empty() {
        format!("{}-{}", note_id, file_name)
    } else {
        format!("{}-{}.{}", note_id, file_name, extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple() {
        assert_eq!(
            split_file_name("report.pdf"),
            ("report".to_string(), "pdf".to_string())
        );
    }

    #[test]
    fn test_split_uses_last_dot() {
        assert_eq!(
            split_file_name("backup.tar.gz"),
            ("backup.tar".to_string(), "gz".to_string())
        );
    }

    #[test]
    fn test_split_no_extension() {
        assert_eq!(
            split_file_name("Makefile"),
            ("Makefile".to_string(), String::new())
        );
    }

    #[test]
    fn test_split_dotfile() {
        assert_eq!(
            split_file_name(".env"),
            (String::new(), "env".to_string())
        );
    }

    #[test]
    fn test_object_key_with_extension() {
        assert_eq!(object_key(42, "report", "pdf"), "42-report.pdf");
    }

    #[test]
    fn test_object_key_without_extension() {
        assert_eq!(object_key(42, "Makefile", ""), "42-Makefile");
    }

    #[test]
    fn test_object_key_matches_original_name() {
        // Upload and delete both go through split + object_key, so the key
        // must reproduce "{note}-{original}" for ordinary names.
        for original in ["report.pdf", "backup.tar.gz", "Makefile", ".env", "a b.txt"] {
            let (name, ext) = split_file_name(original);
            assert_eq!(object_key(7, &name, &ext), format!("7-{}", original));
        }
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("/tmp/report.pdf").unwrap(), "report.pdf");
        assert_eq!(
            sanitize_file_name("C:\\Users\\me\\report.pdf").unwrap(),
            "report.pdf"
        );
        assert_eq!(sanitize_file_name("../../etc/passwd").unwrap(), "passwd");
    }

    #[test]
    fn test_sanitize_rejects_empty_names() {
        assert!(sanitize_file_name("").is_err());
        assert!(sanitize_file_name("   ").is_err());
        assert!(sanitize_file_name("dir/").is_err());
        assert!(sanitize_file_name("..").is_err());
    }

    #[test]
    fn test_sanitize_rejects_control_characters() {
        assert!(sanitize_file_name("bad\nname.txt").is_err());
    }
}
