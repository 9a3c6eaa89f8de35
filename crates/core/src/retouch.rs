//! Auto-retouch adjustments.
//!
//! The retouch stage normalises exposure toward a target mean luma, lifts
//! saturation and brightness slightly, then applies a mild unsharp mask.
//! All pixel math lives here so the pipeline stage stays a thin wrapper
//! around storage and persistence.

use image::RgbImage;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Mean luma the exposure correction aims for (mid-tone on the 0-255 scale,
/// biased slightly bright for outdoor race photography).
pub const TARGET_MEAN_LUMA: f32 = 118.0;

/// Deadband around the target within which no exposure gain is applied.
pub const LUMA_DEADBAND: f32 = 8.0;

/// Exposure gain is clamped into this range; beyond it the correction does
/// more harm than good and the photo is better left to a human editor.
pub const MIN_GAIN: f32 = 0.70;
pub const MAX_GAIN: f32 = 1.60;

/// Saturation multiplier applied around the per-pixel luma.
pub const SATURATION_LIFT: f32 = 1.12;

/// Flat brightness lift added after gain, in 0-255 units.
pub const BRIGHTNESS_LIFT: f32 = 5.0;

/// Unsharp-mask parameters (sigma, threshold) for the final mild sharpen.
pub const SHARPEN_SIGMA: f32 = 1.0;
pub const SHARPEN_THRESHOLD: i32 = 4;

// ---------------------------------------------------------------------------
// Measurement
// ---------------------------------------------------------------------------

/// Mean luma of an RGB frame using the Rec. 601 weights.
pub fn mean_luma(frame: &RgbImage) -> f32 {
    let (w, h) = frame.dimensions();
    if w == 0 || h == 0 {
        return 0.0;
    }
    let mut acc = 0.0f64;
    for px in frame.pixels() {
        acc += luma(px.0) as f64;
    }
    (acc / (w as f64 * h as f64)) as f32
}

fn luma(rgb: [u8; 3]) -> f32 {
    0.299 * rgb[0] as f32 + 0.587 * rgb[1] as f32 + 0.114 * rgb[2] as f32
}

/// Exposure gain that moves `mean` toward [`TARGET_MEAN_LUMA`].
///
/// Returns 1.0 inside the deadband; otherwise `target / mean` clamped into
/// `MIN_GAIN..=MAX_GAIN`. A zero mean (black frame) also returns 1.0 since
/// no gain can fix it.
pub fn exposure_gain(mean: f32) -> f32 {
    if mean <= 0.0 || (mean - TARGET_MEAN_LUMA).abs() <= LUMA_DEADBAND {
        return 1.0;
    }
    (TARGET_MEAN_LUMA / mean).clamp(MIN_GAIN, MAX_GAIN)
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Apply the full retouch: exposure gain, saturation and brightness lift,
/// then a mild unsharp mask. Consumes and returns the frame.
pub fn retouch_frame(frame: RgbImage) -> RgbImage {
    let gain = exposure_gain(mean_luma(&frame));
    let adjusted = adjust_pixels(frame, gain);
    image::imageops::unsharpen(&adjusted, SHARPEN_SIGMA, SHARPEN_THRESHOLD)
}

/// Per-pixel pass: saturation lift around the pixel's own luma, then gain
/// and brightness, clamped to the 8-bit range.
fn adjust_pixels(mut frame: RgbImage, gain: f32) -> RgbImage {
    for px in frame.pixels_mut() {
        let l = luma(px.0);
        for ch in 0..3 {
            let saturated = l + (px.0[ch] as f32 - l) * SATURATION_LIFT;
            let exposed = saturated * gain + BRIGHTNESS_LIFT;
            px.0[ch] = exposed.clamp(0.0, 255.0) as u8;
        }
    }
    frame
}
