//! Media type allow-list and pre-network source validation.
//!
//! Uploads are validated locally (exists, non-empty, under the platform
//! ceiling, allowed container format) before any session is created or any
//! byte leaves the machine. Validation failures never mutate a session.

use std::path::{Path, PathBuf};

/// Allowed container extensions and the MIME type sent in session metadata.
const ALLOWED: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("avi", "video/x-msvideo"),
    ("ts", "video/mp2t"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
];

/// MIME type for an allow-listed file extension, or None if not allowed.
pub fn media_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Descriptor of a validated upload source.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub file_name: String,
    pub file_size: u64,
    pub media_type: &'static str,
}

/// Why a source file was rejected before any network call.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("file is empty: {}", .0.display())]
    Empty(PathBuf),
    #[error("file is {size} bytes, over the {limit} byte upload ceiling")]
    TooLarge { size: u64, limit: u64 },
    #[error("unsupported media type: {}", .0.display())]
    UnsupportedType(PathBuf),
}

/// Validate an upload source against the allow-list and size ceiling.
pub fn validate_source(path: &Path, max_file_bytes: u64) -> Result<SourceInfo, ValidationError> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(_) => return Err(ValidationError::NotFound(path.to_path_buf())),
    };
    if !meta.is_file() {
        return Err(ValidationError::NotAFile(path.to_path_buf()));
    }
    let size = meta.len();
    if size == 0 {
        return Err(ValidationError::Empty(path.to_path_buf()));
    }
    if size > max_file_bytes {
        return Err(ValidationError::TooLarge {
            size,
            limit: max_file_bytes,
        });
    }
    let media_type = media_type_for(path)
        .ok_or_else(|| ValidationError::UnsupportedType(path.to_path_buf()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.bin".to_string());

    Ok(SourceInfo {
        file_name,
        file_size: size,
        media_type,
    })
}
