pub mod credits;
pub mod health;
pub mod live;
pub mod uploads;
pub mod watermark;

use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::state::AppState;

/// Request body cap for one submission. Bounds what a single request may
/// buffer; per-file and per-batch limits are enforced separately by the
/// upload validators.
const BODY_LIMIT: usize = 1024 * 1024 * 1024;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /events/{event_id}/uploads        POST    submit a batch (multipart)
/// /uploads/{session_id}             GET     session snapshot
/// /uploads/{session_id}/stream      GET     session progress (SSE)
///
/// /events/{event_id}/live/photos    POST    submit a live photo (multipart)
/// /events/{event_id}/live/stream    GET     event live feed (SSE)
///
/// /events/{event_id}/watermark      PUT     store custom watermark (multipart)
/// /events/{event_id}/watermark      DELETE  clear custom watermark
///
/// /users/{user_id}/credits          GET     balance and ledger history
/// /users/{user_id}/credits          POST    top up credits
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(uploads::router())
        .merge(live::router())
        .merge(watermark::router())
        .merge(credits::router())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}
