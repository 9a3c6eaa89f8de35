//! Clients for the external vision providers.
//!
//! Two backends do the actual image understanding: a hosted vision API
//! (bib OCR, face indexing, labels, collection clustering) and an
//! on-prem OCR sidecar for events that must not ship photos off-site.
//! The pipeline never talks to either directly; it goes through the
//! traits in [`service`] so tests can swap in fakes.

pub mod cloud;
pub mod error;
mod http;
pub mod local;
pub mod service;
pub mod types;

pub use cloud::CloudVisionClient;
pub use error::VisionError;
pub use local::LocalOcrClient;
pub use service::{BibDetector, ClusterRunner, FaceIndexer, LabelDetector, VisionService};
pub use types::{BibDetection, BoundingBox, DetectedNumber, IndexedFace, Label, OcrEngine};
