//! Stage 4: bib-number OCR.
//!
//! Runs on every tier. Raw detections from the selected engine go through
//! candidate filtering (digit runs, plausible lengths, the event's start
//! list when it has one) and the surviving set replaces the photo's bib
//! rows in one transaction.

use sqlx::PgPool;

use finishpix_core::bibs::{aggregate_confidence, filter_candidates, hint_set};
use finishpix_db::models::event::Event;
use finishpix_db::repositories::BibNumberRepo;
use finishpix_vision::VisionService;

use crate::error::StageError;
use crate::job::PhotoJob;

/// What OCR decided for one photo.
#[derive(Debug, Clone)]
pub struct OcrOutcome {
    pub bib_numbers: Vec<String>,
    pub confidence: f32,
}

pub struct OcrStage {
    pool: PgPool,
    vision: VisionService,
}

impl OcrStage {
    pub fn new(pool: PgPool, vision: VisionService) -> Self {
        Self { pool, vision }
    }

    /// Detect, filter, and persist the photo's bib numbers.
    pub async fn run(
        &self,
        job: &PhotoJob,
        event: &Event,
        image_bytes: &[u8],
    ) -> Result<OcrOutcome, StageError> {
        let hints = hint_set(&event.start_numbers);
        let hint_arg = if hints.is_empty() {
            None
        } else {
            Some(hints.as_slice())
        };

        let detection = self
            .vision
            .detector_for(job.ocr_engine)
            .detect_bibs(image_bytes, hint_arg)
            .await?;

        let raw = detection
            .numbers
            .into_iter()
            .map(|n| (n.number, n.confidence));
        let candidates = filter_candidates(raw, &hints);
        let confidence = aggregate_confidence(&candidates);

        BibNumberRepo::replace_for_photo(
            &self.pool,
            job.photo_id,
            job.ocr_engine.as_str(),
            confidence,
            &candidates,
        )
        .await?;

        tracing::debug!(
            photo_id = job.photo_id,
            engine = job.ocr_engine.as_str(),
            bibs = candidates.len(),
            confidence,
            "bib numbers recorded",
        );

        Ok(OcrOutcome {
            bib_numbers: candidates.into_iter().map(|c| c.number).collect(),
            confidence,
        })
    }
}
