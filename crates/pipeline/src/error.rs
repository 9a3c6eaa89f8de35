//! Error types for pipeline execution.

use finishpix_core::types::DbId;
use finishpix_storage::StorageError;
use finishpix_vision::VisionError;

/// Failure of a single pipeline stage.
///
/// The executor decides per stage whether one of these is fatal for the
/// photo or only worth a warning; the variants just name the collaborator
/// that failed.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("vision: {0}")]
    Vision(#[from] VisionError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("image processing: {0}")]
    Image(#[from] image::ImageError),
}

/// Failure that aborts one photo's pipeline task.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The photo row disappeared between submission and execution.
    #[error("photo {photo_id} not found")]
    PhotoMissing { photo_id: DbId },

    /// The event row disappeared between submission and execution.
    #[error("event {event_id} not found")]
    EventMissing { event_id: DbId },

    /// The original bytes could not be loaded from object storage.
    #[error("failed to load original for photo {photo_id}: {source}")]
    Load {
        photo_id: DbId,
        source: StorageError,
    },

    /// The original bytes are not a decodable image.
    #[error("failed to decode photo {photo_id}: {source}")]
    Decode {
        photo_id: DbId,
        source: image::ImageError,
    },

    /// Bib OCR failed; without its verdict no refund decision can be
    /// made, so the photo's task is aborted.
    #[error("bib OCR failed for photo {photo_id}: {source}")]
    Ocr {
        photo_id: DbId,
        source: StageError,
    },

    /// A required database read or write failed.
    #[error("database error for photo {photo_id}: {source}")]
    Database {
        photo_id: DbId,
        source: sqlx::Error,
    },
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocr_error_names_the_photo() {
        let err = PipelineError::Ocr {
            photo_id: 42,
            source: StageError::Vision(VisionError::Api {
                status: 503,
                message: "unavailable".to_string(),
            }),
        };
        let text = err.to_string();
        assert!(text.contains("photo 42"));
        assert!(text.contains("503"));
    }

    #[test]
    fn stage_error_wraps_storage() {
        let err = StageError::from(StorageError::NotFound {
            key: "orig/1/a.jpg".to_string(),
        });
        assert!(err.to_string().starts_with("storage:"));
    }
}
