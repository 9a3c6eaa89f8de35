//! Event entity model and DTOs.

use finishpix_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `events` table.
///
/// The feature flags gate premium pipeline stages per event;
/// `start_numbers` is the optional start list fed to bib OCR as hints.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: DbId,
    pub owner_user_id: DbId,
    pub name: String,
    pub watermark_text: Option<String>,
    pub watermark_image_key: Option<String>,
    pub auto_retouch_enabled: bool,
    pub face_search_enabled: bool,
    pub label_detection_enabled: bool,
    pub start_numbers: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Event {
    /// Text rendered into the generated watermark pattern: the configured
    /// watermark text, or the event name when none is set.
    pub fn effective_watermark_text(&self) -> &str {
        match self.watermark_text.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => &self.name,
        }
    }
}

/// DTO for creating a new event.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEvent {
    pub owner_user_id: DbId,
    pub name: String,
    pub watermark_text: Option<String>,
    pub auto_retouch_enabled: Option<bool>,
    pub face_search_enabled: Option<bool>,
    pub label_detection_enabled: Option<bool>,
    pub start_numbers: Option<Vec<String>>,
}
