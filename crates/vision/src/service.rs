//! Provider-facing traits and the bundle the pipeline injects.
//!
//! Stage code depends on these traits, never on the concrete clients,
//! so integration tests can run the whole pipeline against scripted
//! fakes without a network.

use std::sync::Arc;

use async_trait::async_trait;

use finishpix_core::types::DbId;

use crate::cloud::CloudVisionClient;
use crate::error::VisionError;
use crate::local::LocalOcrClient;
use crate::types::{BibDetection, IndexedFace, Label, OcrEngine};

// ------------------------------------------------------------------
// Traits
// ------------------------------------------------------------------

/// Reads bib numbers off a photo.
#[async_trait]
pub trait BibDetector: Send + Sync {
    /// Detect bib candidates in `image`. `hints` carries the event's
    /// known start numbers when available; detectors may use them to
    /// bias recognition and must tolerate `None`.
    async fn detect_bibs(
        &self,
        image: &[u8],
        hints: Option<&[String]>,
    ) -> Result<BibDetection, VisionError>;
}

/// Stores faces from a photo into the provider's per-event collection.
#[async_trait]
pub trait FaceIndexer: Send + Sync {
    /// Index every face in `image` under `external_id`
    /// (`"{event_id}:{photo_id}"`), returning the stored faces.
    async fn index_faces(
        &self,
        image: &[u8],
        external_id: &str,
    ) -> Result<Vec<IndexedFace>, VisionError>;
}

/// Detects scene/content labels in a photo.
#[async_trait]
pub trait LabelDetector: Send + Sync {
    /// Detect up to `max_labels` labels with confidence of at least
    /// `min_confidence` (percent).
    async fn detect_labels(
        &self,
        image: &[u8],
        max_labels: u32,
        min_confidence: f32,
    ) -> Result<Vec<Label>, VisionError>;
}

/// Kicks off provider-side face clustering for an event's collection.
#[async_trait]
pub trait ClusterRunner: Send + Sync {
    /// Request a clustering run over everything indexed for `event_id`.
    /// Fire-and-forget from the caller's perspective; the provider
    /// works asynchronously.
    async fn trigger_clustering(&self, event_id: DbId) -> Result<(), VisionError>;
}

// ------------------------------------------------------------------
// Service bundle
// ------------------------------------------------------------------

/// All vision collaborators the pipeline needs, behind trait objects.
///
/// Production wiring puts the cloud client behind every role except
/// local bib detection; [`VisionService::from_parts`] lets tests wire
/// each role independently.
#[derive(Clone)]
pub struct VisionService {
    cloud_bibs: Arc<dyn BibDetector>,
    local_bibs: Arc<dyn BibDetector>,
    faces: Arc<dyn FaceIndexer>,
    labels: Arc<dyn LabelDetector>,
    clustering: Arc<dyn ClusterRunner>,
}

impl VisionService {
    /// Production wiring from the two real clients.
    pub fn new(cloud: CloudVisionClient, local: LocalOcrClient) -> Self {
        let cloud = Arc::new(cloud);
        Self {
            cloud_bibs: cloud.clone(),
            faces: cloud.clone(),
            labels: cloud.clone(),
            clustering: cloud,
            local_bibs: Arc::new(local),
        }
    }

    /// Assemble a service from individual collaborators.
    pub fn from_parts(
        cloud_bibs: Arc<dyn BibDetector>,
        local_bibs: Arc<dyn BibDetector>,
        faces: Arc<dyn FaceIndexer>,
        labels: Arc<dyn LabelDetector>,
        clustering: Arc<dyn ClusterRunner>,
    ) -> Self {
        Self {
            cloud_bibs,
            local_bibs,
            faces,
            labels,
            clustering,
        }
    }

    /// The bib detector matching the engine requested for a batch.
    pub fn detector_for(&self, engine: OcrEngine) -> &dyn BibDetector {
        match engine {
            OcrEngine::Cloud => self.cloud_bibs.as_ref(),
            OcrEngine::Local => self.local_bibs.as_ref(),
        }
    }

    pub fn faces(&self) -> &dyn FaceIndexer {
        self.faces.as_ref()
    }

    pub fn labels(&self) -> &dyn LabelDetector {
        self.labels.as_ref()
    }

    /// Owned handle for spawned tasks (the cluster scheduler holds one
    /// across its debounce sleep).
    pub fn clustering(&self) -> Arc<dyn ClusterRunner> {
        self.clustering.clone()
    }
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------
