//! Stage 5: face indexing with the vision provider.

use sqlx::PgPool;

use finishpix_core::upload::face_external_id;
use finishpix_db::models::photo::Photo;
use finishpix_db::models::photo_face::NewPhotoFace;
use finishpix_db::repositories::{PhotoFaceRepo, PhotoRepo};
use finishpix_vision::VisionService;

use crate::error::StageError;

pub struct FaceStage {
    pool: PgPool,
    vision: VisionService,
}

impl FaceStage {
    pub fn new(pool: PgPool, vision: VisionService) -> Self {
        Self { pool, vision }
    }

    /// Index the photo's faces with the provider and record them locally.
    /// Returns the number of faces found.
    pub async fn run(&self, photo: &Photo, image_bytes: &[u8]) -> Result<usize, StageError> {
        let external_id = face_external_id(photo.event_id, photo.id);
        let faces = self
            .vision
            .faces()
            .index_faces(image_bytes, &external_id)
            .await?;

        let rows: Vec<NewPhotoFace> = faces
            .iter()
            .map(|face| NewPhotoFace {
                provider_face_id: face.face_id.clone(),
                confidence: face.confidence,
                box_left: face.bounding_box.left,
                box_top: face.bounding_box.top,
                box_width: face.bounding_box.width,
                box_height: face.bounding_box.height,
            })
            .collect();

        PhotoFaceRepo::insert_many(&self.pool, photo.id, &rows).await?;
        PhotoRepo::set_face_indexed(&self.pool, photo.id).await?;

        tracing::debug!(photo_id = photo.id, faces = rows.len(), "faces indexed");
        Ok(rows.len())
    }
}
