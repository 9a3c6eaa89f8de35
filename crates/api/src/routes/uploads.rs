//! Batch upload submission and session progress.
//!
//! Submission is the only place credits are charged. The contract, in
//! order: validate every part, charge the whole batch, store the
//! originals, create the photo rows, register the session, queue the
//! jobs. A validation failure or an insufficient balance leaves nothing
//! behind; a storage or database failure after the charge is compensated
//! with a batch refund before the error surfaces.

use std::convert::Infallible;

use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::Stream;
use serde::Serialize;
use uuid::Uuid;

use finishpix_core::credits::{batch_cost, ProcessingTier};
use finishpix_core::types::DbId;
use finishpix_core::upload::{original_key, validate_batch_size, validate_upload};
use finishpix_core::CoreError;
use finishpix_db::models::event::Event as RaceEvent;
use finishpix_db::models::photo::{CreatePhoto, Photo};
use finishpix_db::repositories::{CreditRepo, DeductOutcome, EventRepo, PhotoRepo};
use finishpix_events::{session_init, SessionSnapshot, StreamKey};
use finishpix_pipeline::{PhotoJob, ProgressKey};
use finishpix_vision::OcrEngine;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::sse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events/{event_id}/uploads", post(submit_batch))
        .route("/uploads/{session_id}", get(session_snapshot))
        .route("/uploads/{session_id}/stream", get(session_stream))
}

// ---------------------------------------------------------------------------
// Request parsing
// ---------------------------------------------------------------------------

/// One file part of a batch submission, fully buffered and validated.
struct IncomingFile {
    file_name: String,
    content_type: String,
    bytes: Bytes,
}

/// The non-file form fields of a submission.
struct BatchForm {
    tier: ProcessingTier,
    ocr_engine: OcrEngine,
    files: Vec<IncomingFile>,
}

/// Drain the multipart body into files and form fields.
///
/// Any part with a filename counts as a photo; `tier` is required,
/// `ocr_engine` defaults to the cloud provider. Unknown text fields are
/// ignored.
async fn read_batch_form(mut multipart: Multipart) -> AppResult<BatchForm> {
    let mut tier: Option<ProcessingTier> = None;
    let mut ocr_engine = OcrEngine::Cloud;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            validate_upload(&file_name, &content_type, bytes.len())?;
            files.push(IncomingFile {
                file_name,
                content_type,
                bytes,
            });
            continue;
        }

        match field.name() {
            Some("tier") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                tier = Some(ProcessingTier::parse(&value).ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "Unknown processing tier '{value}' (expected 'standard' or 'premium')"
                    ))
                })?);
            }
            Some("ocr_engine") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                ocr_engine = OcrEngine::parse(&value).ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "Unknown OCR engine '{value}' (expected 'cloud' or 'local')"
                    ))
                })?;
            }
            _ => {}
        }
    }

    let tier = tier.ok_or_else(|| AppError::BadRequest("Missing 'tier' field".to_string()))?;

    validate_batch_size(files.len())?;

    Ok(BatchForm {
        tier,
        ocr_engine,
        files,
    })
}

// ---------------------------------------------------------------------------
// POST /events/{event_id}/uploads
// ---------------------------------------------------------------------------

/// Body returned for an accepted batch.
#[derive(Debug, Serialize)]
pub struct BatchAccepted {
    pub session_id: Uuid,
    pub total: u32,
    pub credits_charged: i32,
}

/// Accept a batch of photos for an event, charge the owner, and queue
/// every photo for processing. Responds `202 Accepted`; progress is
/// followed via the session endpoints.
async fn submit_batch(
    State(state): State<AppState>,
    Path(event_id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<BatchAccepted>>)> {
    let event = EventRepo::find_by_id(&state.pool, event_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "event",
            id: event_id,
        })?;

    let form = read_batch_form(multipart).await?;

    // Charge the whole batch up front. Standard batches cost nothing.
    let cost = batch_cost(
        form.tier,
        form.files.len(),
        state.pipeline_config.credits_per_photo,
    );
    if cost > 0 {
        let reason = format!(
            "Premium batch of {} photos for event {}",
            form.files.len(),
            event.id
        );
        let outcome =
            CreditRepo::deduct_for_batch(&state.pool, event.owner_user_id, cost, event.id, &reason)
                .await?;
        if let DeductOutcome::Insufficient {
            required,
            available,
        } = outcome
        {
            return Err(CoreError::InsufficientCredits {
                required,
                available,
            }
            .into());
        }
    }

    let photos = match persist_batch(&state, &event, form.tier, &form.files).await {
        Ok(photos) => photos,
        Err(error) => {
            if cost > 0 {
                compensate_failed_batch(&state, &event, cost).await;
            }
            return Err(error);
        }
    };

    let session_id = state
        .tracker
        .create_session(event.id, photos.len() as u32)
        .await;

    for photo in &photos {
        let job = PhotoJob {
            photo_id: photo.id,
            event_id: event.id,
            uploader_user_id: event.owner_user_id,
            file_name: photo.file_name.clone(),
            tier: form.tier,
            ocr_engine: form.ocr_engine,
            progress: ProgressKey::Session(session_id),
        };
        let pipeline = state.pipeline.clone();
        state.workers.spawn(format!("photo-{}", photo.id), async move {
            pipeline.process(job).await.map(|_| ())
        });
    }

    tracing::info!(
        event_id = event.id,
        session_id = %session_id,
        total = photos.len(),
        tier = form.tier.as_str(),
        credits_charged = cost,
        "batch accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: BatchAccepted {
                session_id,
                total: photos.len() as u32,
                credits_charged: cost,
            },
        }),
    ))
}

/// Store every original and create the photo rows.
async fn persist_batch(
    state: &AppState,
    event: &RaceEvent,
    tier: ProcessingTier,
    files: &[IncomingFile],
) -> AppResult<Vec<Photo>> {
    let mut rows = Vec::with_capacity(files.len());
    for file in files {
        let stem = Uuid::new_v4().to_string();
        let storage_key = original_key(event.id, &stem);
        state
            .storage
            .put(&storage_key, file.bytes.to_vec(), &file.content_type)
            .await?;
        rows.push(CreatePhoto {
            file_name: file.file_name.clone(),
            storage_key,
            content_type: file.content_type.clone(),
            size_bytes: file.bytes.len() as i64,
            credit_deducted: tier.is_premium(),
        });
    }
    Ok(PhotoRepo::create_batch(&state.pool, event.id, event.owner_user_id, &rows).await?)
}

/// Give the batch charge back after a post-deduction failure. The
/// original error is what the client sees; a refund failure on top of it
/// is logged for operator follow-up.
async fn compensate_failed_batch(state: &AppState, event: &RaceEvent, cost: i32) {
    let reason = format!("Batch submission failed for event {}", event.id);
    match CreditRepo::record_batch_refund(
        &state.pool,
        event.owner_user_id,
        cost,
        event.id,
        &reason,
    )
    .await
    {
        Ok(_) => {
            tracing::warn!(
                event_id = event.id,
                user_id = event.owner_user_id,
                amount = cost,
                "batch charge refunded after submission failure"
            );
        }
        Err(error) => {
            tracing::error!(
                event_id = event.id,
                user_id = event.owner_user_id,
                amount = cost,
                %error,
                "compensating refund failed; ledger needs manual correction"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// GET /uploads/{session_id}
// ---------------------------------------------------------------------------

/// Current snapshot of a batch session. Sessions live in memory and are
/// swept some time after completion, so a 404 here can also mean the
/// session simply expired.
async fn session_snapshot(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<DataResponse<SessionSnapshot>>> {
    let snapshot = state
        .tracker
        .session_snapshot(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Upload session {session_id} not found")))?;

    Ok(Json(DataResponse { data: snapshot }))
}

// ---------------------------------------------------------------------------
// GET /uploads/{session_id}/stream
// ---------------------------------------------------------------------------

/// Attach to a session's progress stream. The first frame is an `init`
/// snapshot; afterwards every processed or failed photo produces one
/// frame, in counter order.
async fn session_stream(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let snapshot = state
        .tracker
        .session_snapshot(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Upload session {session_id} not found")))?;

    let rx = state
        .hub
        .subscribe(StreamKey::Session(session_id), session_init(snapshot))
        .await;

    Ok(sse::stream_response(rx))
}
