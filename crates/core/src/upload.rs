//! Upload validation and object-key conventions.
//!
//! Validates incoming photo files before any credit is charged, and builds
//! every storage key the system writes so the layout is defined in exactly
//! one place.

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Largest accepted upload (48 MiB covers full-resolution JPEGs from
/// current press bodies).
pub const MAX_UPLOAD_BYTES: usize = 48 * 1024 * 1024;

/// Maximum number of files in one batch submission.
pub const MAX_BATCH_SIZE: usize = 500;

/// Maximum length of an original file name.
const MAX_FILE_NAME_LEN: usize = 255;

/// Content types the pipeline can decode.
const ACCEPTED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate one uploaded file's metadata.
pub fn validate_upload(file_name: &str, content_type: &str, size: usize) -> Result<(), CoreError> {
    if file_name.trim().is_empty() || file_name.len() > MAX_FILE_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Invalid file name (1-{MAX_FILE_NAME_LEN} characters required)"
        )));
    }
    if file_name.contains('/') || file_name.contains('\\') || file_name.contains("..") {
        return Err(CoreError::Validation(
            "File name must not contain path separators".into(),
        ));
    }
    if !ACCEPTED_CONTENT_TYPES.contains(&content_type) {
        return Err(CoreError::Validation(format!(
            "Unsupported content type '{content_type}'. Must be one of: {ACCEPTED_CONTENT_TYPES:?}"
        )));
    }
    if size == 0 {
        return Err(CoreError::Validation("File is empty".into()));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(CoreError::Validation(format!(
            "File exceeds the {MAX_UPLOAD_BYTES} byte upload limit"
        )));
    }
    Ok(())
}

/// Validate the file count of a batch submission.
pub fn validate_batch_size(count: usize) -> Result<(), CoreError> {
    if count == 0 {
        return Err(CoreError::Validation(
            "Batch must contain at least one file".into(),
        ));
    }
    if count > MAX_BATCH_SIZE {
        return Err(CoreError::Validation(format!(
            "Batch exceeds the {MAX_BATCH_SIZE} file limit"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Object keys
// ---------------------------------------------------------------------------

/// Prefix of original uploads.
pub const PREFIX_ORIGINAL: &str = "orig";

/// Prefix of watermarked display copies.
pub const PREFIX_WATERMARK: &str = "wm";

/// Prefix of micro thumbnails.
pub const PREFIX_THUMBNAIL: &str = "thumb";

/// Key of an original upload. `stem` is the random name assigned at
/// submission (photo ids do not exist yet when the bytes are stored).
pub fn original_key(event_id: DbId, stem: &str) -> String {
    format!("{PREFIX_ORIGINAL}/{event_id}/{stem}.jpg")
}

/// Rewrite an original's key under a sibling prefix, preserving the event
/// directory and stem. `"orig/7/ab.jpg"` becomes `"wm/7/ab.jpg"`.
pub fn derived_key(original_key: &str, prefix: &str) -> String {
    match original_key.split_once('/') {
        Some((_, rest)) => format!("{prefix}/{rest}"),
        None => format!("{prefix}/{original_key}"),
    }
}

/// Key of an event's operator-supplied watermark image.
pub fn event_watermark_key(event_id: DbId) -> String {
    format!("watermarks/{event_id}.png")
}

/// External id used when indexing faces with the vision provider, so a
/// vendor-side face maps back to its event and photo.
pub fn face_external_id(event_id: DbId, photo_id: DbId) -> String {
    format!("{event_id}:{photo_id}")
}
