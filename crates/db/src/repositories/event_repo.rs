//! Repository for the `events` table.

use sqlx::PgPool;

use finishpix_core::types::DbId;

use crate::models::event::{CreateEvent, Event};

/// Column list for `events` queries.
const COLUMNS: &str = "\
    id, owner_user_id, name, watermark_text, watermark_image_key, \
    auto_retouch_enabled, face_search_enabled, label_detection_enabled, \
    start_numbers, created_at, updated_at";

pub struct EventRepo;

impl EventRepo {
    /// Create a new event. Unspecified feature flags default to enabled.
    pub async fn create(pool: &PgPool, input: &CreateEvent) -> Result<Event, sqlx::Error> {
        let query = format!(
            "INSERT INTO events \
             (owner_user_id, name, watermark_text, auto_retouch_enabled, \
              face_search_enabled, label_detection_enabled, start_numbers) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(input.owner_user_id)
            .bind(&input.name)
            .bind(&input.watermark_text)
            .bind(input.auto_retouch_enabled.unwrap_or(true))
            .bind(input.face_search_enabled.unwrap_or(true))
            .bind(input.label_detection_enabled.unwrap_or(true))
            .bind(input.start_numbers.clone().unwrap_or_default())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Event>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Set or clear the operator-supplied watermark image key. Callers must
    /// invalidate the pipeline's decoded-watermark cache afterwards.
    pub async fn set_watermark_image(
        pool: &PgPool,
        id: DbId,
        key: Option<&str>,
    ) -> Result<Option<Event>, sqlx::Error> {
        let query = format!(
            "UPDATE events SET watermark_image_key = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .bind(key)
            .fetch_optional(pool)
            .await
    }
}
