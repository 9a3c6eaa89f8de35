//! Repository for the `photos` table.
//!
//! One setter per pipeline stage so each stage owns exactly the columns it
//! writes. OCR results are recorded by `BibNumberRepo::replace_for_photo`,
//! which updates the photo inside the same transaction as the bib rows.

use sqlx::PgPool;

use finishpix_core::types::DbId;

use crate::models::photo::{CreatePhoto, Photo};

/// Column list for `photos` queries.
const COLUMNS: &str = "\
    id, event_id, uploader_user_id, file_name, storage_key, content_type, \
    size_bytes, sharpness_score, is_blurry, auto_edited, watermark_key, \
    thumbnail_key, ocr_engine, ocr_confidence, face_indexed, labels, \
    processed_at, credit_deducted, credit_refunded, created_at, updated_at";

pub struct PhotoRepo;

impl PhotoRepo {
    /// Insert all rows of a batch in one transaction: either the whole
    /// batch exists afterwards or none of it does.
    pub async fn create_batch(
        pool: &PgPool,
        event_id: DbId,
        uploader_user_id: DbId,
        inputs: &[CreatePhoto],
    ) -> Result<Vec<Photo>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut photos = Vec::with_capacity(inputs.len());

        let query = format!(
            "INSERT INTO photos \
             (event_id, uploader_user_id, file_name, storage_key, content_type, \
              size_bytes, credit_deducted) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        for input in inputs {
            let photo = sqlx::query_as::<_, Photo>(&query)
                .bind(event_id)
                .bind(uploader_user_id)
                .bind(&input.file_name)
                .bind(&input.storage_key)
                .bind(&input.content_type)
                .bind(input.size_bytes)
                .bind(input.credit_deducted)
                .fetch_one(&mut *tx)
                .await?;
            photos.push(photo);
        }

        tx.commit().await?;
        Ok(photos)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Photo>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM photos WHERE id = $1");
        sqlx::query_as::<_, Photo>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Stage 1: record the sharpness score and blur verdict.
    pub async fn set_quality(
        pool: &PgPool,
        id: DbId,
        sharpness_score: f32,
        is_blurry: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE photos SET sharpness_score = $2, is_blurry = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(sharpness_score)
        .bind(is_blurry)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Stage 2: mark the stored original as auto-retouched.
    pub async fn set_auto_edited(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE photos SET auto_edited = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Stage 3: record the watermarked copy and micro thumbnail keys.
    pub async fn set_watermark_keys(
        pool: &PgPool,
        id: DbId,
        watermark_key: &str,
        thumbnail_key: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE photos SET watermark_key = $2, thumbnail_key = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(watermark_key)
        .bind(thumbnail_key)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Stage 5: mark faces as indexed with the vision provider.
    pub async fn set_face_indexed(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE photos SET face_indexed = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Stage 6: record detected labels as a JSON array.
    pub async fn set_labels(
        pool: &PgPool,
        id: DbId,
        labels: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE photos SET labels = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(labels)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Final step: stamp the photo as fully processed.
    pub async fn mark_processed(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE photos SET processed_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
