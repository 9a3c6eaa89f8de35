//! The six pipeline stages and their shared reporting types.
//!
//! Stage order is fixed: quality, retouch, watermark, OCR, faces, labels.
//! Each stage is a small struct owning exactly the collaborators it needs;
//! the executor decides which stages run for a given tier and event, and
//! how each stage's failure is treated.

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

pub mod faces;
pub mod labels;
pub mod ocr;
pub mod quality;
pub mod retouch;
pub mod watermark;

/// JPEG quality for re-encoded derivatives (retouched originals,
/// watermarked copies, thumbnails).
pub(crate) const JPEG_QUALITY: u8 = 90;

// ---------------------------------------------------------------------------
// Stage identity and per-photo reports
// ---------------------------------------------------------------------------

/// The stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageName {
    Quality,
    Retouch,
    Watermark,
    Ocr,
    Faces,
    Labels,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Quality => "quality",
            StageName::Retouch => "retouch",
            StageName::Watermark => "watermark",
            StageName::Ocr => "ocr",
            StageName::Faces => "faces",
            StageName::Labels => "labels",
        }
    }
}

/// How a stage ended for one photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Completed,
    Skipped,
    Failed,
}

/// One stage's outcome for one photo, kept on the pipeline result for
/// logging and tests.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: StageName,
    pub status: StageStatus,
    pub detail: Option<String>,
}

impl StageReport {
    pub fn completed(stage: StageName) -> Self {
        Self {
            stage,
            status: StageStatus::Completed,
            detail: None,
        }
    }

    pub fn skipped(stage: StageName, reason: &str) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            detail: Some(reason.to_string()),
        }
    }

    pub fn failed(stage: StageName, error: &impl std::fmt::Display) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            detail: Some(error.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared encoding helper
// ---------------------------------------------------------------------------

/// Encode an RGB frame as JPEG. Derivatives are always written as RGB
/// JPEGs regardless of the upload's original format.
pub(crate) fn encode_jpeg(frame: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY).encode_image(frame)?;
    Ok(bytes)
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------
