//! The per-photo pipeline executor.
//!
//! One [`PhotoPipeline`] is built at startup and shared by every worker.
//! `process` runs the six stages in order for one photo, applies the
//! per-stage failure policy, reconciles credits once the bib verdict is
//! in, and reports the outcome on the job's progress stream.
//!
//! Failure policy: quality falls back to a neutral score, retouch,
//! watermark, faces, and labels log and continue, OCR aborts the photo.
//! A photo that loses its watermark still gets found by bib number; a
//! photo without a bib verdict cannot settle its credit, so it fails.

use std::sync::Arc;

use sqlx::PgPool;

use finishpix_core::types::DbId;
use finishpix_db::repositories::{EventRepo, PhotoRepo};
use finishpix_events::ProgressTracker;
use finishpix_storage::ObjectStore;
use finishpix_vision::VisionService;

use crate::config::PipelineConfig;
use crate::credits::CreditReconciler;
use crate::debounce::ClusterScheduler;
use crate::error::PipelineError;
use crate::job::{PhotoJob, ProgressKey};
use crate::overlay_cache::OverlayCache;
use crate::stages::faces::FaceStage;
use crate::stages::labels::LabelStage;
use crate::stages::ocr::OcrStage;
use crate::stages::quality::{QualityStage, QualityVerdict};
use crate::stages::retouch::RetouchStage;
use crate::stages::watermark::WatermarkStage;
use crate::stages::{StageName, StageReport};

/// Result of one photo's trip through the pipeline.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub photo_id: DbId,
    pub bib_numbers: Vec<String>,
    pub refunded: bool,
    pub reports: Vec<StageReport>,
}

pub struct PhotoPipeline {
    pool: PgPool,
    storage: Arc<dyn ObjectStore>,
    tracker: Arc<ProgressTracker>,
    scheduler: Arc<ClusterScheduler>,
    reconciler: CreditReconciler,
    quality: QualityStage,
    retouch: RetouchStage,
    watermark: WatermarkStage,
    ocr: OcrStage,
    faces: FaceStage,
    labels: LabelStage,
}

impl PhotoPipeline {
    pub fn new(
        pool: PgPool,
        storage: Arc<dyn ObjectStore>,
        vision: VisionService,
        tracker: Arc<ProgressTracker>,
        scheduler: Arc<ClusterScheduler>,
        overlays: Arc<OverlayCache>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            quality: QualityStage::new(pool.clone(), config.blur_threshold),
            retouch: RetouchStage::new(pool.clone(), storage.clone()),
            watermark: WatermarkStage::new(
                pool.clone(),
                storage.clone(),
                overlays,
                config.display_edge,
                config.thumb_edge,
                config.overlay_opacity,
            ),
            ocr: OcrStage::new(pool.clone(), vision.clone()),
            faces: FaceStage::new(pool.clone(), vision.clone()),
            labels: LabelStage::new(
                pool.clone(),
                vision,
                config.label_max,
                config.label_min_confidence,
            ),
            reconciler: CreditReconciler::new(pool.clone(), config.credits_per_photo),
            pool,
            storage,
            tracker,
            scheduler,
        }
    }

    /// Run the pipeline for one photo and report the outcome on the
    /// job's progress stream either way. On success the event's
    /// clustering debounce is rescheduled.
    pub async fn process(&self, job: PhotoJob) -> Result<PipelineOutcome, PipelineError> {
        match self.run(&job).await {
            Ok(outcome) => {
                match job.progress {
                    ProgressKey::Session(session_id) => {
                        if outcome.refunded {
                            self.tracker.refund_recorded(session_id).await;
                        }
                        self.tracker
                            .photo_processed(
                                session_id,
                                job.photo_id,
                                &job.file_name,
                                outcome.bib_numbers.clone(),
                            )
                            .await;
                    }
                    ProgressKey::Live => {
                        self.tracker
                            .live_photo_processed(
                                job.event_id,
                                job.photo_id,
                                &job.file_name,
                                outcome.bib_numbers.clone(),
                            )
                            .await;
                    }
                }
                self.scheduler.schedule(job.event_id).await;
                Ok(outcome)
            }
            Err(error) => {
                let message = error.to_string();
                match job.progress {
                    ProgressKey::Session(session_id) => {
                        self.tracker
                            .photo_failed(session_id, job.photo_id, &job.file_name, &message)
                            .await;
                    }
                    ProgressKey::Live => {
                        self.tracker
                            .live_photo_failed(job.event_id, job.photo_id, &job.file_name, &message)
                            .await;
                    }
                }
                Err(error)
            }
        }
    }

    async fn run(&self, job: &PhotoJob) -> Result<PipelineOutcome, PipelineError> {
        let photo = PhotoRepo::find_by_id(&self.pool, job.photo_id)
            .await
            .map_err(|source| PipelineError::Database {
                photo_id: job.photo_id,
                source,
            })?
            .ok_or(PipelineError::PhotoMissing {
                photo_id: job.photo_id,
            })?;
        let event = EventRepo::find_by_id(&self.pool, job.event_id)
            .await
            .map_err(|source| PipelineError::Database {
                photo_id: job.photo_id,
                source,
            })?
            .ok_or(PipelineError::EventMissing {
                event_id: job.event_id,
            })?;

        let mut bytes =
            self.storage
                .get(&photo.storage_key)
                .await
                .map_err(|source| PipelineError::Load {
                    photo_id: photo.id,
                    source,
                })?;
        let mut image =
            image::load_from_memory(&bytes).map_err(|source| PipelineError::Decode {
                photo_id: photo.id,
                source,
            })?;

        let premium = job.tier.is_premium();
        let mut reports = Vec::with_capacity(6);

        // Stage 1: quality.
        let verdict = if premium {
            match self.quality.run(photo.id, &image).await {
                Ok(verdict) => {
                    reports.push(StageReport::completed(StageName::Quality));
                    verdict
                }
                Err(error) => {
                    tracing::warn!(
                        photo_id = photo.id,
                        error = %error,
                        "quality stage failed, recording fallback score",
                    );
                    reports.push(StageReport::failed(StageName::Quality, &error));
                    self.quality.persist_fallback(photo.id).await
                }
            }
        } else {
            reports.push(StageReport::skipped(StageName::Quality, "standard tier"));
            QualityVerdict::fallback()
        };

        // Stage 2: retouch. The retouched frame replaces the working
        // image and bytes so every later stage sees the corrected photo.
        if !premium {
            reports.push(StageReport::skipped(StageName::Retouch, "standard tier"));
        } else if !event.auto_retouch_enabled {
            reports.push(StageReport::skipped(StageName::Retouch, "disabled for event"));
        } else if verdict.is_blurry {
            reports.push(StageReport::skipped(StageName::Retouch, "photo is blurry"));
        } else {
            match self.retouch.run(&photo, &image).await {
                Ok((new_image, new_bytes)) => {
                    image = new_image;
                    bytes = new_bytes;
                    reports.push(StageReport::completed(StageName::Retouch));
                }
                Err(error) => {
                    tracing::warn!(
                        photo_id = photo.id,
                        error = %error,
                        "retouch stage failed, continuing with the original",
                    );
                    reports.push(StageReport::failed(StageName::Retouch, &error));
                }
            }
        }

        // Stage 3: watermark.
        if premium {
            match self.watermark.run(&photo, &event, &image).await {
                Ok(_) => reports.push(StageReport::completed(StageName::Watermark)),
                Err(error) => {
                    tracing::warn!(
                        photo_id = photo.id,
                        error = %error,
                        "watermark stage failed, photo keeps processing",
                    );
                    reports.push(StageReport::failed(StageName::Watermark, &error));
                }
            }
        } else {
            reports.push(StageReport::skipped(StageName::Watermark, "standard tier"));
        }

        // Stage 4: OCR, on every tier. The only stage whose failure
        // aborts the photo.
        if let ProgressKey::Session(session_id) = job.progress {
            self.tracker
                .session_step(session_id, "Detecting bib numbers")
                .await;
        }
        let ocr = self
            .ocr
            .run(job, &event, &bytes)
            .await
            .map_err(|source| PipelineError::Ocr {
                photo_id: photo.id,
                source,
            })?;
        reports.push(StageReport::completed(StageName::Ocr));

        let refunded = self
            .reconciler
            .reconcile(&photo, ocr.bib_numbers.len())
            .await
            .map_err(|source| PipelineError::Database {
                photo_id: photo.id,
                source,
            })?;

        // Stage 5: faces.
        if !premium {
            reports.push(StageReport::skipped(StageName::Faces, "standard tier"));
        } else if !event.face_search_enabled {
            reports.push(StageReport::skipped(StageName::Faces, "disabled for event"));
        } else {
            match self.faces.run(&photo, &bytes).await {
                Ok(_) => reports.push(StageReport::completed(StageName::Faces)),
                Err(error) => {
                    tracing::warn!(
                        photo_id = photo.id,
                        error = %error,
                        "face indexing failed, photo keeps processing",
                    );
                    reports.push(StageReport::failed(StageName::Faces, &error));
                }
            }
        }

        // Stage 6: labels.
        if !premium {
            reports.push(StageReport::skipped(StageName::Labels, "standard tier"));
        } else if !event.label_detection_enabled {
            reports.push(StageReport::skipped(StageName::Labels, "disabled for event"));
        } else {
            match self.labels.run(photo.id, &bytes).await {
                Ok(_) => reports.push(StageReport::completed(StageName::Labels)),
                Err(error) => {
                    tracing::warn!(
                        photo_id = photo.id,
                        error = %error,
                        "label detection failed, photo keeps processing",
                    );
                    reports.push(StageReport::failed(StageName::Labels, &error));
                }
            }
        }

        PhotoRepo::mark_processed(&self.pool, photo.id)
            .await
            .map_err(|source| PipelineError::Database {
                photo_id: photo.id,
                source,
            })?;

        tracing::info!(
            photo_id = photo.id,
            event_id = event.id,
            tier = job.tier.as_str(),
            bibs = ocr.bib_numbers.len(),
            refunded,
            "photo processed",
        );

        Ok(PipelineOutcome {
            photo_id: photo.id,
            bib_numbers: ocr.bib_numbers,
            refunded,
            reports,
        })
    }
}
