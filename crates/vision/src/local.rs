//! Client for the on-prem OCR sidecar.
//!
//! The sidecar exposes a single `POST /ocr` endpoint returning raw text
//! lines. This client reshapes those lines into [`BibDetection`] so the
//! pipeline treats both OCR engines identically; plausibility filtering
//! of the raw text happens downstream.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::VisionError;
use crate::http::{encode_image, parse_response};
use crate::service::BibDetector;
use crate::types::{BibDetection, DetectedNumber};

/// HTTP client for the local OCR sidecar.
pub struct LocalOcrClient {
    client: reqwest::Client,
    api_url: String,
}

/// Response body of the sidecar's `/ocr` endpoint.
#[derive(Debug, Deserialize)]
struct OcrResponse {
    lines: Vec<OcrLine>,
}

/// One recognised text line.
#[derive(Debug, Deserialize)]
struct OcrLine {
    text: String,
    confidence: f32,
}

impl LocalOcrClient {
    /// Create a new client.
    ///
    /// * `api_url` - Base URL, e.g. `http://127.0.0.1:9090`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }
}

#[async_trait]
impl BibDetector for LocalOcrClient {
    /// `POST /ocr`. The start-number hints become the sidecar's
    /// `allowlist`, biasing recognition toward known bibs.
    async fn detect_bibs(
        &self,
        image: &[u8],
        hints: Option<&[String]>,
    ) -> Result<BibDetection, VisionError> {
        tracing::debug!(image_bytes = image.len(), "requesting local OCR");
        let body = serde_json::json!({
            "image": encode_image(image),
            "allowlist": hints,
        });
        let response = self
            .client
            .post(format!("{}/ocr", self.api_url))
            .json(&body)
            .send()
            .await?;
        let parsed: OcrResponse = parse_response(response).await?;
        Ok(detection_from_lines(parsed.lines))
    }
}

/// Reshape raw OCR lines into the common detection type. Aggregate
/// confidence is the maximum over the lines, `0.0` when nothing was
/// read.
fn detection_from_lines(lines: Vec<OcrLine>) -> BibDetection {
    let numbers: Vec<DetectedNumber> = lines
        .into_iter()
        .map(|line| DetectedNumber {
            number: line.text,
            confidence: line.confidence,
        })
        .collect();
    let confidence = numbers
        .iter()
        .map(|number| number.confidence)
        .fold(0.0_f32, f32::max);
    BibDetection {
        numbers,
        confidence,
    }
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------
