//! Stage 1: sharpness scoring.

use image::DynamicImage;
use sqlx::PgPool;

use finishpix_core::sharpness::{self, FALLBACK_SCORE};
use finishpix_core::types::DbId;
use finishpix_db::repositories::PhotoRepo;

use crate::error::StageError;

/// Outcome of the quality stage, consumed by the retouch gate.
#[derive(Debug, Clone, Copy)]
pub struct QualityVerdict {
    pub score: f32,
    pub is_blurry: bool,
}

impl QualityVerdict {
    /// Verdict recorded when scoring fails: a mid-scale score that never
    /// flags the photo blurry, so later stages still run.
    pub fn fallback() -> Self {
        Self {
            score: FALLBACK_SCORE,
            is_blurry: false,
        }
    }
}

pub struct QualityStage {
    pool: PgPool,
    blur_threshold: f32,
}

impl QualityStage {
    pub fn new(pool: PgPool, blur_threshold: f32) -> Self {
        Self {
            pool,
            blur_threshold,
        }
    }

    /// Score the frame and persist the verdict on the photo row.
    pub async fn run(&self, photo_id: DbId, image: &DynamicImage) -> Result<QualityVerdict, StageError> {
        let frame = sharpness::analysis_frame(image);
        let score = sharpness::sharpness_score(&frame);
        let is_blurry = sharpness::is_blurry(score, self.blur_threshold);

        PhotoRepo::set_quality(&self.pool, photo_id, score, is_blurry).await?;
        tracing::debug!(photo_id, score, is_blurry, "sharpness scored");

        Ok(QualityVerdict { score, is_blurry })
    }

    /// Persist the fallback verdict after a scoring failure. Persistence
    /// errors here are logged and swallowed; the photo keeps moving.
    pub async fn persist_fallback(&self, photo_id: DbId) -> QualityVerdict {
        let verdict = QualityVerdict::fallback();
        if let Err(error) =
            PhotoRepo::set_quality(&self.pool, photo_id, verdict.score, verdict.is_blurry).await
        {
            tracing::warn!(photo_id, error = %error, "failed to persist fallback sharpness verdict");
        }
        verdict
    }
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------
