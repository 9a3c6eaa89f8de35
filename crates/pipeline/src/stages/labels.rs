//! Stage 6: scene label detection.

use sqlx::PgPool;

use finishpix_core::types::DbId;
use finishpix_db::repositories::PhotoRepo;
use finishpix_vision::VisionService;

use crate::error::StageError;

pub struct LabelStage {
    pool: PgPool,
    vision: VisionService,
    max_labels: u32,
    min_confidence: f32,
}

impl LabelStage {
    pub fn new(pool: PgPool, vision: VisionService, max_labels: u32, min_confidence: f32) -> Self {
        Self {
            pool,
            vision,
            max_labels,
            min_confidence,
        }
    }

    /// Detect scene labels and store them as a JSON array on the photo.
    /// Returns the number of labels kept.
    pub async fn run(&self, photo_id: DbId, image_bytes: &[u8]) -> Result<usize, StageError> {
        let labels = self
            .vision
            .labels()
            .detect_labels(image_bytes, self.max_labels, self.min_confidence)
            .await?;

        let json: serde_json::Value = labels
            .iter()
            .map(|label| {
                serde_json::json!({
                    "name": label.name,
                    "confidence": label.confidence,
                })
            })
            .collect();
        PhotoRepo::set_labels(&self.pool, photo_id, &json).await?;

        tracing::debug!(photo_id, labels = labels.len(), "scene labels recorded");
        Ok(labels.len())
    }
}
