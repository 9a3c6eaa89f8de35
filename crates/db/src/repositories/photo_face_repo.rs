//! Repository for the `photo_faces` table.

use sqlx::PgPool;

use finishpix_core::types::DbId;

use crate::models::photo_face::{NewPhotoFace, PhotoFace};

/// Column list for `photo_faces` queries.
const COLUMNS: &str = "\
    id, photo_id, provider_face_id, confidence, \
    box_left, box_top, box_width, box_height, created_at";

pub struct PhotoFaceRepo;

impl PhotoFaceRepo {
    /// Insert the faces indexed on a photo in one transaction. Rows are
    /// additive; the vendor-side index is too, so nothing is cleared.
    pub async fn insert_many(
        pool: &PgPool,
        photo_id: DbId,
        faces: &[NewPhotoFace],
    ) -> Result<Vec<PhotoFace>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert = format!(
            "INSERT INTO photo_faces \
             (photo_id, provider_face_id, confidence, box_left, box_top, box_width, box_height) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        let mut rows = Vec::with_capacity(faces.len());
        for face in faces {
            let row = sqlx::query_as::<_, PhotoFace>(&insert)
                .bind(photo_id)
                .bind(&face.provider_face_id)
                .bind(face.confidence)
                .bind(face.box_left)
                .bind(face.box_top)
                .bind(face.box_width)
                .bind(face.box_height)
                .fetch_one(&mut *tx)
                .await?;
            rows.push(row);
        }

        tx.commit().await?;
        Ok(rows)
    }

    pub async fn list_for_photo(
        pool: &PgPool,
        photo_id: DbId,
    ) -> Result<Vec<PhotoFace>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM photo_faces WHERE photo_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, PhotoFace>(&query)
            .bind(photo_id)
            .fetch_all(pool)
            .await
    }
}
