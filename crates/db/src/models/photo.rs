//! Photo entity model and DTOs.

use finishpix_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `photos` table.
///
/// Analysis fields start NULL/FALSE and are written only by their owning
/// pipeline stage. The two credit flags are set once and never reset, even
/// when a photo is reprocessed.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Photo {
    pub id: DbId,
    pub event_id: DbId,
    pub uploader_user_id: DbId,
    pub file_name: String,
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub sharpness_score: Option<f32>,
    pub is_blurry: bool,
    pub auto_edited: bool,
    pub watermark_key: Option<String>,
    pub thumbnail_key: Option<String>,
    pub ocr_engine: Option<String>,
    pub ocr_confidence: Option<f32>,
    pub face_indexed: bool,
    pub labels: Option<serde_json::Value>,
    pub processed_at: Option<Timestamp>,
    pub credit_deducted: bool,
    pub credit_refunded: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating one photo row at batch submission.
#[derive(Debug, Clone)]
pub struct CreatePhoto {
    pub file_name: String,
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    /// True when the batch was charged, so a later zero-bib outcome can
    /// trigger a refund.
    pub credit_deducted: bool,
}
