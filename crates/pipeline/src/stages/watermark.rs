//! Stage 3: watermarked display copy and micro thumbnail.
//!
//! The display copy is the original downscaled to the display edge (never
//! upscaled), stamped with either the event's custom watermark image or
//! the generated tiled text overlay. The thumbnail is derived from the
//! watermarked copy so even the smallest preview carries the mark.

use std::sync::Arc;

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use sqlx::PgPool;

use finishpix_core::upload::{derived_key, PREFIX_THUMBNAIL, PREFIX_WATERMARK};
use finishpix_core::watermark::{composite_text_overlay, fade_alpha, render_tiled_overlay};
use finishpix_db::models::event::Event;
use finishpix_db::models::photo::Photo;
use finishpix_db::repositories::PhotoRepo;
use finishpix_storage::ObjectStore;

use crate::error::StageError;
use crate::overlay_cache::OverlayCache;
use crate::stages::encode_jpeg;

/// Object keys written by the watermark stage.
#[derive(Debug, Clone)]
pub struct WatermarkKeys {
    pub watermark_key: String,
    pub thumbnail_key: String,
}

pub struct WatermarkStage {
    pool: PgPool,
    storage: Arc<dyn ObjectStore>,
    overlays: Arc<OverlayCache>,
    display_edge: u32,
    thumb_edge: u32,
    opacity: f32,
}

impl WatermarkStage {
    pub fn new(
        pool: PgPool,
        storage: Arc<dyn ObjectStore>,
        overlays: Arc<OverlayCache>,
        display_edge: u32,
        thumb_edge: u32,
        opacity: f32,
    ) -> Self {
        Self {
            pool,
            storage,
            overlays,
            display_edge,
            thumb_edge,
            opacity,
        }
    }

    /// Produce and store the watermarked display copy and its thumbnail,
    /// then record both keys on the photo row.
    pub async fn run(
        &self,
        photo: &Photo,
        event: &Event,
        image: &DynamicImage,
    ) -> Result<WatermarkKeys, StageError> {
        let display = display_copy(image, self.display_edge);

        let stamped: RgbImage = match self.custom_overlay(event).await? {
            Some(custom) => stamp_custom(&display, &custom, self.opacity),
            None => {
                let mut rgb = display.to_rgb8();
                let (width, height) = rgb.dimensions();
                let text = event.effective_watermark_text();
                let overlay = self
                    .overlays
                    .text_overlay(width, height, text, || {
                        render_tiled_overlay(width, height, text)
                    })
                    .await;
                composite_text_overlay(&mut rgb, &overlay, self.opacity);
                rgb
            }
        };

        let wm_bytes = encode_jpeg(&stamped)?;
        let thumb = if stamped.width().max(stamped.height()) > self.thumb_edge {
            DynamicImage::ImageRgb8(stamped)
                .thumbnail(self.thumb_edge, self.thumb_edge)
                .to_rgb8()
        } else {
            stamped
        };
        let thumb_bytes = encode_jpeg(&thumb)?;

        let watermark_key = derived_key(&photo.storage_key, PREFIX_WATERMARK);
        let thumbnail_key = derived_key(&photo.storage_key, PREFIX_THUMBNAIL);
        self.storage
            .put(&watermark_key, wm_bytes, "image/jpeg")
            .await?;
        self.storage
            .put(&thumbnail_key, thumb_bytes, "image/jpeg")
            .await?;
        PhotoRepo::set_watermark_keys(&self.pool, photo.id, &watermark_key, &thumbnail_key).await?;

        tracing::debug!(
            photo_id = photo.id,
            %watermark_key,
            %thumbnail_key,
            "watermarked copy and thumbnail written",
        );
        Ok(WatermarkKeys {
            watermark_key,
            thumbnail_key,
        })
    }

    /// The event's decoded custom watermark image, fetched through the
    /// per-event cache.
    async fn custom_overlay(&self, event: &Event) -> Result<Option<Arc<DynamicImage>>, StageError> {
        let Some(key) = event.watermark_image_key.as_deref() else {
            return Ok(None);
        };
        if let Some(cached) = self.overlays.cached_custom(event.id).await {
            return Ok(Some(cached));
        }

        let bytes = self.storage.get(key).await?;
        let decoded = image::load_from_memory(&bytes)?;
        Ok(Some(self.overlays.store_custom(event.id, decoded).await))
    }
}

// ---- private helpers ----

/// Downscale to fit the display edge. Smaller images pass through at
/// their native size.
fn display_copy(image: &DynamicImage, edge: u32) -> DynamicImage {
    if image.width().max(image.height()) > edge {
        image.resize(edge, edge, FilterType::Lanczos3)
    } else {
        image.clone()
    }
}

/// Composite the operator's watermark image centred on the display copy,
/// scaled to half the display width, at reduced alpha.
fn stamp_custom(display: &DynamicImage, custom: &DynamicImage, opacity: f32) -> RgbImage {
    let mut canvas = display.to_rgba8();
    let target_w = (canvas.width() / 2).max(1);
    let mut stamp = custom
        .resize(target_w, canvas.height().max(1), FilterType::Lanczos3)
        .to_rgba8();
    fade_alpha(&mut stamp, opacity);

    let x = canvas.width().saturating_sub(stamp.width()) / 2;
    let y = canvas.height().saturating_sub(stamp.height()) / 2;
    image::imageops::overlay(&mut canvas, &stamp, x as i64, y as i64);

    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------
