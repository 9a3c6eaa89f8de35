//! Tunables for the processing pipeline.

use std::time::Duration;

use finishpix_core::credits::DEFAULT_CREDITS_PER_PHOTO;
use finishpix_core::sharpness::DEFAULT_BLUR_THRESHOLD;

/// Default cap on concurrently processing photos.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Default quiet period before a clustering run fires.
pub const DEFAULT_CLUSTER_DEBOUNCE: Duration = Duration::from_secs(30);

/// Longest edge of the watermarked display copy, in pixels.
pub const DISPLAY_EDGE: u32 = 1600;

/// Longest edge of the micro thumbnail, in pixels.
pub const THUMB_EDGE: u32 = 160;

/// Overlay opacity for watermarking.
pub const OVERLAY_OPACITY: f32 = 0.35;

/// Label detection request cap.
pub const LABEL_MAX: u32 = 10;

/// Minimum label confidence (percent) worth persisting.
pub const LABEL_MIN_CONFIDENCE: f32 = 55.0;

/// Runtime configuration for the pipeline, normally built by the API
/// layer from environment variables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Worker pool capacity (`MAX_CONCURRENT_PHOTOS`). Clamped to at
    /// least 1 by [`WorkerPool::new`](crate::worker_pool::WorkerPool::new).
    pub max_concurrent: usize,
    /// Sharpness score below which a photo counts as blurry
    /// (`BLUR_THRESHOLD`).
    pub blur_threshold: f32,
    /// Price of one premium photo (`CREDITS_PER_PHOTO`).
    pub credits_per_photo: i32,
    /// Quiet period for the clustering debounce
    /// (`CLUSTER_DEBOUNCE_SECS`).
    pub cluster_debounce: Duration,
    pub display_edge: u32,
    pub thumb_edge: u32,
    pub overlay_opacity: f32,
    pub label_max: u32,
    pub label_min_confidence: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            blur_threshold: DEFAULT_BLUR_THRESHOLD,
            credits_per_photo: DEFAULT_CREDITS_PER_PHOTO,
            cluster_debounce: DEFAULT_CLUSTER_DEBOUNCE,
            display_edge: DISPLAY_EDGE,
            thumb_edge: THUMB_EDGE,
            overlay_opacity: OVERLAY_OPACITY,
            label_max: LABEL_MAX,
            label_min_confidence: LABEL_MIN_CONFIDENCE,
        }
    }
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------
