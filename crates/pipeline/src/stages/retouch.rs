//! Stage 2: automatic retouch of the stored original.
//!
//! The retouched frame replaces the original object under the same key, so
//! every later stage and every download sees the corrected image. The
//! executor gates this stage on the event flag and the blur verdict before
//! calling in.

use std::sync::Arc;

use image::DynamicImage;
use sqlx::PgPool;

use finishpix_core::retouch::retouch_frame;
use finishpix_db::models::photo::Photo;
use finishpix_db::repositories::PhotoRepo;
use finishpix_storage::ObjectStore;

use crate::error::StageError;
use crate::stages::encode_jpeg;

pub struct RetouchStage {
    pool: PgPool,
    storage: Arc<dyn ObjectStore>,
}

impl RetouchStage {
    pub fn new(pool: PgPool, storage: Arc<dyn ObjectStore>) -> Self {
        Self { pool, storage }
    }

    /// Retouch the frame, overwrite the stored original, and mark the
    /// photo as auto-edited. Returns the new working frame and its encoded
    /// bytes so the rest of the pipeline operates on the retouched image.
    pub async fn run(
        &self,
        photo: &Photo,
        image: &DynamicImage,
    ) -> Result<(DynamicImage, Vec<u8>), StageError> {
        let retouched = retouch_frame(image.to_rgb8());
        let bytes = encode_jpeg(&retouched)?;

        self.storage
            .put(&photo.storage_key, bytes.clone(), "image/jpeg")
            .await?;
        PhotoRepo::set_auto_edited(&self.pool, photo.id).await?;

        tracing::debug!(
            photo_id = photo.id,
            bytes = bytes.len(),
            "auto-retouch applied and original replaced",
        );
        Ok((DynamicImage::ImageRgb8(retouched), bytes))
    }
}
