//! Sharpness scoring for quality analysis.
//!
//! A photo is scored 0-100 from the variance of its Laplacian edge energy,
//! computed on a small grayscale analysis frame. Finish-line shots with
//! motion blur or missed focus produce flat Laplacian responses and land
//! near the bottom of the scale; crisp shots saturate it.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Longest edge of the downsampled analysis frame, in pixels. Scoring on a
/// fixed-size frame keeps scores comparable across camera resolutions.
pub const ANALYSIS_EDGE: u32 = 512;

/// Laplacian variance that maps to a score of 100. Anything above clamps.
pub const VARIANCE_AT_MAX_SCORE: f64 = 1200.0;

/// Default score threshold below which a photo is flagged blurry.
pub const DEFAULT_BLUR_THRESHOLD: f32 = 28.0;

/// Score recorded when quality analysis fails outright. Sits mid-scale so a
/// failed analysis neither flags the photo blurry nor inflates its ranking.
pub const FALLBACK_SCORE: f32 = 50.0;

// ---------------------------------------------------------------------------
// Analysis frame
// ---------------------------------------------------------------------------

/// Downsample `image` to the grayscale analysis frame used for scoring.
///
/// The longest edge is reduced to [`ANALYSIS_EDGE`] (never upscaled);
/// aspect ratio is preserved.
pub fn analysis_frame(image: &DynamicImage) -> GrayImage {
    let (w, h) = (image.width(), image.height());
    if w.max(h) <= ANALYSIS_EDGE {
        return image.to_luma8();
    }
    let scale = ANALYSIS_EDGE as f64 / w.max(h) as f64;
    let nw = ((w as f64 * scale).round() as u32).max(1);
    let nh = ((h as f64 * scale).round() as u32).max(1);
    image::imageops::resize(&image.to_luma8(), nw, nh, FilterType::Triangle)
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Compute the 0-100 sharpness score of a grayscale frame.
///
/// The score is the variance of the 4-neighbour Laplacian over all interior
/// pixels, scaled linearly so [`VARIANCE_AT_MAX_SCORE`] maps to 100 and
/// clamped into `0.0..=100.0`. Frames smaller than 3x3 have no interior
/// pixels and score 0.
pub fn sharpness_score(frame: &GrayImage) -> f32 {
    let (w, h) = frame.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0u64;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let c = frame.get_pixel(x, y).0[0] as i32;
            let left = frame.get_pixel(x - 1, y).0[0] as i32;
            let right = frame.get_pixel(x + 1, y).0[0] as i32;
            let up = frame.get_pixel(x, y - 1).0[0] as i32;
            let down = frame.get_pixel(x, y + 1).0[0] as i32;
            let lap = (4 * c - left - right - up - down) as f64;
            sum += lap;
            sum_sq += lap * lap;
            count += 1;
        }
    }

    let n = count as f64;
    let mean = sum / n;
    let variance = (sum_sq / n) - mean * mean;

    ((variance / VARIANCE_AT_MAX_SCORE) * 100.0).clamp(0.0, 100.0) as f32
}

/// Whether `score` falls below the blur threshold.
pub fn is_blurry(score: f32, threshold: f32) -> bool {
    score < threshold
}
