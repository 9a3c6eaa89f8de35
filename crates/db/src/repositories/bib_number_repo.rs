//! Repository for the `bib_numbers` table.

use sqlx::PgPool;

use finishpix_core::bibs::BibCandidate;
use finishpix_core::types::DbId;

use crate::models::bib_number::BibNumber;

/// Column list for `bib_numbers` queries.
const COLUMNS: &str = "id, photo_id, number, confidence, created_at";

pub struct BibNumberRepo;

impl BibNumberRepo {
    /// Atomically replace a photo's bib rows with a new detection run and
    /// record the engine and aggregate confidence on the photo itself.
    ///
    /// Runs as one transaction so readers never observe a half-replaced
    /// set, and a reprocessed photo never keeps stale numbers.
    pub async fn replace_for_photo(
        pool: &PgPool,
        photo_id: DbId,
        engine: &str,
        aggregate_confidence: f32,
        candidates: &[BibCandidate],
    ) -> Result<Vec<BibNumber>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM bib_numbers WHERE photo_id = $1")
            .bind(photo_id)
            .execute(&mut *tx)
            .await?;

        let insert = format!(
            "INSERT INTO bib_numbers (photo_id, number, confidence) \
             VALUES ($1, $2, $3) RETURNING {COLUMNS}"
        );
        let mut rows = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let row = sqlx::query_as::<_, BibNumber>(&insert)
                .bind(photo_id)
                .bind(&candidate.number)
                .bind(candidate.confidence)
                .fetch_one(&mut *tx)
                .await?;
            rows.push(row);
        }

        sqlx::query(
            "UPDATE photos SET ocr_engine = $2, ocr_confidence = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(photo_id)
        .bind(engine)
        .bind(aggregate_confidence)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(rows)
    }

    pub async fn list_for_photo(
        pool: &PgPool,
        photo_id: DbId,
    ) -> Result<Vec<BibNumber>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bib_numbers WHERE photo_id = $1 ORDER BY number"
        );
        sqlx::query_as::<_, BibNumber>(&query)
            .bind(photo_id)
            .fetch_all(pool)
            .await
    }
}
