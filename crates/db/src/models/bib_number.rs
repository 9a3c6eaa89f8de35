//! Bib number rows recorded by the OCR stage.

use finishpix_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `bib_numbers` table. Rows for a photo are deleted and
/// recreated wholesale by each OCR run.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BibNumber {
    pub id: DbId,
    pub photo_id: DbId,
    pub number: String,
    pub confidence: f32,
    pub created_at: Timestamp,
}
