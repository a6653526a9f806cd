//! Media file helpers: upload validation, content-type inference, and
//! filename sanitization.
//!
//! The extension allow-list and content-type table are domain constants of
//! the gateway's external contract, not configuration.

use crate::error::CoreError;

/// File extensions accepted for uploaded source images.
pub const ALLOWED_UPLOAD_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Fallback content type for files with an unrecognized extension.
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// Return the lowercase extension of a filename, if any.
pub fn file_extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Validate that an uploaded filename carries an allowed image extension.
///
/// Rejects filenames with no extension or with anything outside
/// [`ALLOWED_UPLOAD_EXTENSIONS`]. This runs before any file is written.
pub fn validate_upload_extension(filename: &str) -> Result<(), CoreError> {
    match file_extension(filename) {
        Some(ext) if ALLOWED_UPLOAD_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(CoreError::Validation(format!(
            "Invalid file type for '{filename}'. Allowed types: png, jpg, jpeg, gif"
        ))),
    }
}

/// Infer the HTTP content type for an output file from its extension.
///
/// Known types: png, jpg/jpeg, mp4, gif. Anything else is served as
/// [`CONTENT_TYPE_BINARY`].
pub fn content_type_for(filename: &str) -> &'static str {
    match file_extension(filename).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("mp4") => "video/mp4",
        Some("gif") => "image/gif",
        _ => CONTENT_TYPE_BINARY,
    }
}

/// Sanitize an uploaded filename to a safe basename.
///
/// Strips any path components and replaces characters outside
/// `[A-Za-z0-9._-]` with underscores, so the result can be joined onto a
/// storage directory without escaping it.
pub fn sanitize_filename(filename: &str) -> String {
    let basename = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    basename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}
