//! Live-mode uploads and the per-event live feed.
//!
//! Live mode is the on-site flow: photos arrive one at a time straight
//! from the finish line and spectators watch the event feed. Every live
//! photo runs the full premium pipeline and is charged as a batch of
//! one.

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

use finishpix_core::credits::ProcessingTier;
use finishpix_core::types::DbId;
use finishpix_core::upload::{original_key, validate_upload};
use finishpix_core::CoreError;
use finishpix_db::models::photo::CreatePhoto;
use finishpix_db::repositories::{CreditRepo, DeductOutcome, EventRepo, PhotoRepo};
use finishpix_events::{live_init, StreamKey};
use finishpix_pipeline::{PhotoJob, ProgressKey};
use finishpix_vision::OcrEngine;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::sse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events/{event_id}/live/photos", post(submit_live_photo))
        .route("/events/{event_id}/live/stream", get(live_stream))
}

// ---------------------------------------------------------------------------
// Request parsing
// ---------------------------------------------------------------------------

struct LiveForm {
    file_name: String,
    content_type: String,
    bytes: Bytes,
    ocr_engine: OcrEngine,
}

/// Read exactly one photo (plus an optional `ocr_engine` field) from the
/// multipart body.
async fn read_live_form(mut multipart: Multipart) -> AppResult<LiveForm> {
    let mut photo: Option<(String, String, Bytes)> = None;
    let mut ocr_engine = OcrEngine::Cloud;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if let Some(file_name) = field.file_name().map(str::to_string) {
            if photo.is_some() {
                return Err(AppError::BadRequest(
                    "Live mode accepts one photo per request".to_string(),
                ));
            }
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            validate_upload(&file_name, &content_type, bytes.len())?;
            photo = Some((file_name, content_type, bytes));
            continue;
        }

        if field.name() == Some("ocr_engine") {
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
    }

    let (file_name, content_type, bytes) =
        photo.ok_or_else(|| AppError::BadRequest("Missing photo file".to_string()))?;

    Ok(LiveForm {
        file_name,
        content_type,
        bytes,
        ocr_engine,
    })
}

// ---------------------------------------------------------------------------
// POST /events/{event_id}/live/photos
// ---------------------------------------------------------------------------

/// Body returned for an accepted live photo.
#[derive(Debug, Serialize)]
pub struct LiveAccepted {
    pub photo_id: DbId,
}

/// Accept one live photo, charge it, and queue it onto the event feed.
async fn submit_live_photo(
    State(state): State<AppState>,
    Path(event_id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<LiveAccepted>>)> {
    let event = EventRepo::find_by_id(&state.pool, event_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "event",
            id: event_id,
        })?;

    let form = read_live_form(multipart).await?;

    let cost = state.pipeline_config.credits_per_photo;
    let reason = format!("Live photo for event {}", event.id);
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

    let stem = Uuid::new_v4().to_string();
    let storage_key = original_key(event.id, &stem);
    let row = CreatePhoto {
        file_name: form.file_name.clone(),
        storage_key: storage_key.clone(),
        content_type: form.content_type.clone(),
        size_bytes: form.bytes.len() as i64,
        credit_deducted: true,
    };

    let stored = async {
        state
            .storage
            .put(&storage_key, form.bytes.to_vec(), &form.content_type)
            .await?;
        let photos =
            PhotoRepo::create_batch(&state.pool, event.id, event.owner_user_id, &[row]).await?;
        // create_batch returns exactly as many rows as it was given.
        photos
            .into_iter()
            .next()
            .ok_or_else(|| AppError::InternalError("Photo row was not created".to_string()))
    }
    .await;

    let photo = match stored {
        Ok(photo) => photo,
        Err(error) => {
            let reason = format!("Live photo submission failed for event {}", event.id);
            if let Err(refund_error) = CreditRepo::record_batch_refund(
                &state.pool,
                event.owner_user_id,
                cost,
                event.id,
                &reason,
            )
            .await
            {
                tracing::error!(
                    event_id = event.id,
                    user_id = event.owner_user_id,
                    amount = cost,
                    error = %refund_error,
                    "compensating refund failed; ledger needs manual correction"
                );
            }
            return Err(error);
        }
    };

    state
        .tracker
        .live_photo_received(event.id, photo.id, &photo.file_name)
        .await;

    let job = PhotoJob {
        photo_id: photo.id,
        event_id: event.id,
        uploader_user_id: event.owner_user_id,
        file_name: photo.file_name.clone(),
        tier: ProcessingTier::Premium,
        ocr_engine: form.ocr_engine,
        progress: ProgressKey::Live,
    };
    let pipeline = state.pipeline.clone();
    state.workers.spawn(format!("photo-{}", photo.id), async move {
        pipeline.process(job).await.map(|_| ())
    });

    tracing::info!(
        event_id = event.id,
        photo_id = photo.id,
        credits_charged = cost,
        "live photo accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: LiveAccepted { photo_id: photo.id },
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /events/{event_id}/live/stream
// ---------------------------------------------------------------------------

/// Attach to an event's live feed. The `init` frame carries the current
/// counters and recent photos, or zeroed counters when the feed has seen
/// nothing yet.
async fn live_stream(
    State(state): State<AppState>,
    Path(event_id): Path<DbId>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    EventRepo::find_by_id(&state.pool, event_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "event",
            id: event_id,
        })?;

    let snapshot = state.tracker.live_snapshot(event_id).await;
    let rx = state
        .hub
        .subscribe(StreamKey::Live(event_id), live_init(snapshot))
        .await;

    Ok(sse::stream_response(rx))
}
