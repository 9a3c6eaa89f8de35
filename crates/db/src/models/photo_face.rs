//! Face rows recorded by the face-indexing stage.

use finishpix_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `photo_faces` table, one per face the vision provider
/// indexed on a photo. `provider_face_id` is the vendor-side identifier;
/// the bounding box is in relative 0..1 coordinates.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PhotoFace {
    pub id: DbId,
    pub photo_id: DbId,
    pub provider_face_id: String,
    pub confidence: f32,
    pub box_left: f32,
    pub box_top: f32,
    pub box_width: f32,
    pub box_height: f32,
    pub created_at: Timestamp,
}

/// DTO for inserting one face row.
#[derive(Debug, Clone)]
pub struct NewPhotoFace {
    pub provider_face_id: String,
    pub confidence: f32,
    pub box_left: f32,
    pub box_top: f32,
    pub box_width: f32,
    pub box_height: f32,
}
