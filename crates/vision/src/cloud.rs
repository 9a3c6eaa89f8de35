//! REST client for the hosted vision API.
//!
//! Wraps the provider's HTTP endpoints (bib OCR, face indexing, label
//! detection, collection clustering) using [`reqwest`]. Images travel
//! as base64 inside JSON bodies; every request carries the account's
//! bearer key.

use async_trait::async_trait;
use serde::Deserialize;

use finishpix_core::types::DbId;

use crate::error::VisionError;
use crate::http::{check_status, encode_image, parse_response};
use crate::service::{BibDetector, ClusterRunner, FaceIndexer, LabelDetector};
use crate::types::{BibDetection, IndexedFace, Label};

/// HTTP client for the hosted vision API.
pub struct CloudVisionClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

/// Response envelope for `/v1/faces:index`.
#[derive(Debug, Deserialize)]
struct FacesResponse {
    faces: Vec<IndexedFace>,
}

/// Response envelope for `/v1/labels:detect`.
#[derive(Debug, Deserialize)]
struct LabelsResponse {
    labels: Vec<Label>,
}

impl CloudVisionClient {
    /// Create a new client.
    ///
    /// * `api_url` - Base URL, e.g. `https://vision.example.com`.
    /// * `api_key` - Bearer key for the provider account.
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling with the local OCR client).
    pub fn with_client(client: reqwest::Client, api_url: String, api_key: String) -> Self {
        Self {
            client,
            api_url,
            api_key,
        }
    }

    // ---- private helpers ----

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, VisionError> {
        Ok(self
            .client
            .post(format!("{}{}", self.api_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?)
    }
}

#[async_trait]
impl BibDetector for CloudVisionClient {
    /// `POST /v1/bibs:detect`. `hints` serializes as `null` when absent;
    /// the provider treats that the same as an empty list.
    async fn detect_bibs(
        &self,
        image: &[u8],
        hints: Option<&[String]>,
    ) -> Result<BibDetection, VisionError> {
        tracing::debug!(image_bytes = image.len(), "requesting cloud bib detection");
        let body = serde_json::json!({
            "image": encode_image(image),
            "hints": hints,
        });
        let response = self.post("/v1/bibs:detect", &body).await?;
        parse_response(response).await
    }
}

#[async_trait]
impl FaceIndexer for CloudVisionClient {
    /// `POST /v1/faces:index`. The provider stores every detected face
    /// under `external_id` and returns the stored set.
    async fn index_faces(
        &self,
        image: &[u8],
        external_id: &str,
    ) -> Result<Vec<IndexedFace>, VisionError> {
        tracing::debug!(external_id, "requesting face indexing");
        let body = serde_json::json!({
            "image": encode_image(image),
            "external_id": external_id,
        });
        let response = self.post("/v1/faces:index", &body).await?;
        let parsed: FacesResponse = parse_response(response).await?;
        Ok(parsed.faces)
    }
}

#[async_trait]
impl LabelDetector for CloudVisionClient {
    /// `POST /v1/labels:detect`. `min_confidence` is a percentage.
    async fn detect_labels(
        &self,
        image: &[u8],
        max_labels: u32,
        min_confidence: f32,
    ) -> Result<Vec<Label>, VisionError> {
        tracing::debug!(max_labels, min_confidence, "requesting label detection");
        let body = serde_json::json!({
            "image": encode_image(image),
            "max_labels": max_labels,
            "min_confidence": min_confidence,
        });
        let response = self.post("/v1/labels:detect", &body).await?;
        let parsed: LabelsResponse = parse_response(response).await?;
        Ok(parsed.labels)
    }
}

#[async_trait]
impl ClusterRunner for CloudVisionClient {
    /// `POST /v1/faces:cluster`. The provider answers 202 and clusters
    /// in the background; the body is discarded.
    async fn trigger_clustering(&self, event_id: DbId) -> Result<(), VisionError> {
        tracing::debug!(event_id, "requesting face clustering");
        let body = serde_json::json!({ "event_id": event_id });
        let response = self.post("/v1/faces:cluster", &body).await?;
        check_status(response).await
    }
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------
