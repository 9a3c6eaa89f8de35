//! Event watermark image management.
//!
//! An event either carries an operator-supplied watermark image or falls
//! back to the generated text pattern. Changing the image invalidates
//! the pipeline's overlay cache so the next watermark stage reloads it.

use axum::extract::{Multipart, Path, State};
use axum::routing::put;
use axum::{Json, Router};

use finishpix_core::types::DbId;
use finishpix_core::upload::{event_watermark_key, validate_upload};
use finishpix_core::CoreError;
use finishpix_db::models::event::Event;
use finishpix_db::repositories::EventRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/events/{event_id}/watermark",
        put(store_watermark).delete(clear_watermark),
    )
}

// ---------------------------------------------------------------------------
// PUT /events/{event_id}/watermark
// ---------------------------------------------------------------------------

/// Store a custom watermark image for an event and switch the event to
/// it. Returns the updated event.
async fn store_watermark(
    State(state): State<AppState>,
    Path(event_id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<Event>>> {
    let mut image: Option<(String, Vec<u8>)> = None;

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
            image = Some((content_type, bytes.to_vec()));
        }
    }

    let (content_type, bytes) =
        image.ok_or_else(|| AppError::BadRequest("Missing watermark image file".to_string()))?;

    let key = event_watermark_key(event_id);
    state.storage.put(&key, bytes, &content_type).await?;

    let event = EventRepo::set_watermark_image(&state.pool, event_id, Some(&key))
        .await?
        .ok_or(CoreError::NotFound {
            entity: "event",
            id: event_id,
        })?;

    state.overlays.invalidate_custom(event_id).await;

    tracing::info!(event_id, %key, "custom watermark stored");

    Ok(Json(DataResponse { data: event }))
}

// ---------------------------------------------------------------------------
// DELETE /events/{event_id}/watermark
// ---------------------------------------------------------------------------

/// Remove an event's custom watermark image, falling back to the
/// generated text pattern. Returns the updated event.
async fn clear_watermark(
    State(state): State<AppState>,
    Path(event_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Event>>> {
    let event = EventRepo::set_watermark_image(&state.pool, event_id, None)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "event",
            id: event_id,
        })?;

    // Deletes are idempotent; clearing an event that never had an image
    // is fine.
    state.storage.delete(&event_watermark_key(event_id)).await?;
    state.overlays.invalidate_custom(event_id).await;

    tracing::info!(event_id, "custom watermark cleared");

    Ok(Json(DataResponse { data: event }))
}
