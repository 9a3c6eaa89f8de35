//! Response payloads and shared value types for the vision clients.

use serde::Deserialize;

// ------------------------------------------------------------------
// OCR engine selection
// ------------------------------------------------------------------

/// Which OCR backend a batch runs against.
///
/// Chosen per batch at submission time; the string forms (`"cloud"`,
/// `"local"`) are what the upload form carries and what the `photos`
/// table records after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OcrEngine {
    /// Hosted vision API.
    #[default]
    Cloud,
    /// On-prem OCR sidecar.
    Local,
}

impl OcrEngine {
    /// Parse the form-field spelling. Case-insensitive; surrounding
    /// whitespace is ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("cloud") {
            Some(Self::Cloud)
        } else if value.eq_ignore_ascii_case("local") {
            Some(Self::Local)
        } else {
            None
        }
    }

    /// Canonical lowercase name, as persisted on `photos.ocr_engine`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::Local => "local",
        }
    }
}

// ------------------------------------------------------------------
// Provider payloads
// ------------------------------------------------------------------

/// One text candidate returned by a bib detector.
///
/// `number` is the detector's raw reading; plausibility filtering and
/// deduplication happen downstream, so this may still contain
/// non-digit noise from the local sidecar.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectedNumber {
    pub number: String,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Full bib-detection result for one image.
#[derive(Debug, Clone, Deserialize)]
pub struct BibDetection {
    pub numbers: Vec<DetectedNumber>,
    /// Aggregate confidence: the maximum over `numbers`, `0.0` when
    /// nothing was read.
    pub confidence: f32,
}

impl BibDetection {
    /// A detection that read nothing.
    pub fn empty() -> Self {
        Self {
            numbers: Vec::new(),
            confidence: 0.0,
        }
    }
}

/// Axis-aligned face location in relative image coordinates
/// (`0.0..=1.0` on both axes).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// A face stored in the provider's collection for one photo.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexedFace {
    /// Provider-assigned identifier for the stored face.
    pub face_id: String,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

/// A scene/content label detected in a photo.
#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
    /// Detector confidence in `[0, 100]`.
    pub confidence: f32,
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- OcrEngine ----

    #[test]
    fn parse_recognises_both_engines() {
        assert_eq!(OcrEngine::parse("cloud"), Some(OcrEngine::Cloud));
        assert_eq!(OcrEngine::parse("local"), Some(OcrEngine::Local));
    }

    #[test]
    fn parse_is_case_and_whitespace_insensitive() {
        assert_eq!(OcrEngine::parse(" Cloud "), Some(OcrEngine::Cloud));
        assert_eq!(OcrEngine::parse("LOCAL"), Some(OcrEngine::Local));
    }

    #[test]
    fn parse_rejects_unknown_engines() {
        assert_eq!(OcrEngine::parse("tesseract"), None);
        assert_eq!(OcrEngine::parse(""), None);
    }

    #[test]
    fn as_str_round_trips_through_parse() {
        for engine in [OcrEngine::Cloud, OcrEngine::Local] {
            assert_eq!(OcrEngine::parse(engine.as_str()), Some(engine));
        }
    }

    #[test]
    fn default_engine_is_cloud() {
        assert_eq!(OcrEngine::default(), OcrEngine::Cloud);
    }

    // -- payloads ----

    #[test]
    fn bib_detection_deserializes_provider_payload() {
        let json = r#"{
            "numbers": [
                {"number": "4102", "confidence": 0.97},
                {"number": "88", "confidence": 0.61}
            ],
            "confidence": 0.97
        }"#;
        let detection: BibDetection = serde_json::from_str(json).unwrap();
        assert_eq!(detection.numbers.len(), 2);
        assert_eq!(detection.numbers[0].number, "4102");
        assert!((detection.confidence - 0.97).abs() < 1e-6);
    }

    #[test]
    fn indexed_face_deserializes_with_bounding_box() {
        let json = r#"{
            "face_id": "f-93c1",
            "confidence": 0.999,
            "bounding_box": {"left": 0.41, "top": 0.12, "width": 0.08, "height": 0.15}
        }"#;
        let face: IndexedFace = serde_json::from_str(json).unwrap();
        assert_eq!(face.face_id, "f-93c1");
        assert!((face.bounding_box.width - 0.08).abs() < 1e-6);
    }

    #[test]
    fn label_deserializes() {
        let json = r#"{"name": "Marathon", "confidence": 98.2}"#;
        let label: Label = serde_json::from_str(json).unwrap();
        assert_eq!(label.name, "Marathon");
        assert!(label.confidence > 98.0);
    }

    #[test]
    fn empty_detection_has_zero_confidence() {
        let detection = BibDetection::empty();
        assert!(detection.numbers.is_empty());
        assert_eq!(detection.confidence, 0.0);
    }
}
