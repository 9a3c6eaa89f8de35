//! Shared wiring for the API integration tests: the full router with all
//! middleware, an in-memory object store, neutral vision fakes, request
//! builders, and database seed helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use finishpix_api::config::ServerConfig;
use finishpix_api::router::build_app_router;
use finishpix_api::state::AppState;
use finishpix_db::models::event::{CreateEvent, Event};
use finishpix_db::models::user::{CreateUser, User};
use finishpix_db::repositories::{CreditRepo, EventRepo, UserRepo};
use finishpix_events::{ProgressHub, ProgressTracker};
use finishpix_pipeline::{
    ClusterScheduler, OverlayCache, PhotoPipeline, PipelineConfig, WorkerPool,
};
use finishpix_storage::{ObjectStore, StorageError};
use finishpix_vision::{
    BibDetection, BibDetector, ClusterRunner, DetectedNumber, FaceIndexer, IndexedFace, Label,
    LabelDetector, VisionError, VisionService,
};

// ---------------------------------------------------------------------------
// In-memory object store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_prefix: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Make every `put` under `prefix` fail, for fault injection.
    pub fn fail_puts_under(&self, prefix: &str) {
        *self.fail_prefix.lock().unwrap() = Some(prefix.to_string());
    }

    pub fn count_under(&self, prefix: &str) -> usize {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .count()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        if let Some(prefix) = self.fail_prefix.lock().unwrap().as_deref() {
            if key.starts_with(prefix) {
                return Err(StorageError::Io(std::io::Error::other(
                    "injected write failure",
                )));
            }
        }
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Vision fakes
// ---------------------------------------------------------------------------

/// Bib detector that always finds one fixed number, so background
/// processing never triggers refunds that would race balance assertions.
struct StaticBibs;

#[async_trait]
impl BibDetector for StaticBibs {
    async fn detect_bibs(
        &self,
        _image: &[u8],
        _hints: Option<&[String]>,
    ) -> Result<BibDetection, VisionError> {
        Ok(BibDetection {
            numbers: vec![DetectedNumber {
                number: "1234".to_string(),
                confidence: 92.0,
            }],
            confidence: 92.0,
        })
    }
}

struct NoFaces;

#[async_trait]
impl FaceIndexer for NoFaces {
    async fn index_faces(
        &self,
        _image: &[u8],
        _external_id: &str,
    ) -> Result<Vec<IndexedFace>, VisionError> {
        Ok(Vec::new())
    }
}

struct NoLabels;

#[async_trait]
impl LabelDetector for NoLabels {
    async fn detect_labels(
        &self,
        _image: &[u8],
        _max_labels: u32,
        _min_confidence: f32,
    ) -> Result<Vec<Label>, VisionError> {
        Ok(Vec::new())
    }
}

struct NoCluster;

#[async_trait]
impl ClusterRunner for NoCluster {
    async fn trigger_clustering(
        &self,
        _event_id: finishpix_core::types::DbId,
    ) -> Result<(), VisionError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
    }
}

/// The assembled test application plus the handles tests poke directly.
pub struct TestHarness {
    pub app: Router,
    pub storage: Arc<MemoryStore>,
    pub tracker: Arc<ProgressTracker>,
    pub workers: Arc<WorkerPool>,
}

/// Build the full application router with all middleware layers, an
/// in-memory object store, and neutral vision fakes, using the given
/// database pool.
///
/// This goes through [`build_app_router`], so integration tests exercise
/// the same middleware stack (CORS, request ID, timeout, tracing, panic
/// recovery) that production uses.
pub fn build_test_harness(pool: PgPool) -> TestHarness {
    let config = test_config();
    let storage: Arc<MemoryStore> = Arc::new(MemoryStore::default());
    let vision = VisionService::from_parts(
        Arc::new(StaticBibs),
        Arc::new(StaticBibs),
        Arc::new(NoFaces),
        Arc::new(NoLabels),
        Arc::new(NoCluster),
    );

    let pipeline_config = PipelineConfig {
        // Long enough that no clustering run fires mid-test.
        cluster_debounce: Duration::from_secs(600),
        ..PipelineConfig::default()
    };

    let hub = Arc::new(ProgressHub::new());
    let tracker = Arc::new(ProgressTracker::new(hub.clone()));
    let overlays = Arc::new(OverlayCache::new());
    let scheduler = Arc::new(ClusterScheduler::new(
        pipeline_config.cluster_debounce,
        vision.clustering(),
    ));
    let pipeline = Arc::new(PhotoPipeline::new(
        pool.clone(),
        storage.clone(),
        vision,
        tracker.clone(),
        scheduler,
        overlays.clone(),
        &pipeline_config,
    ));
    let workers = Arc::new(WorkerPool::new(pipeline_config.max_concurrent));

    let state = AppState {
        pool,
        config: Arc::new(config),
        storage: storage.clone(),
        tracker: tracker.clone(),
        hub,
        pipeline,
        workers: workers.clone(),
        overlays,
        pipeline_config,
    };

    TestHarness {
        app: build_app_router(state),
        storage,
        tracker,
        workers,
    }
}

pub fn build_test_app(pool: PgPool) -> Router {
    build_test_harness(pool).app
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Boundary used by [`multipart_request`].
pub const BOUNDARY: &str = "finishpix-test-boundary";

/// One part of a hand-built multipart body.
pub enum Part<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

/// Build a multipart/form-data request from parts.
pub fn multipart_request(method: Method, uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; \
                         filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A small, razor-sharp JPEG (1-pixel checkerboard), so background
/// quality analysis never classifies fixtures as blurry.
pub fn sharp_jpeg(width: u32, height: u32) -> Vec<u8> {
    let frame = image::RgbImage::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            image::Rgb([255, 255, 255])
        } else {
            image::Rgb([0, 0, 0])
        }
    });
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, 90)
        .encode_image(&frame)
        .unwrap();
    bytes
}

/// A small solid-red PNG for watermark uploads.
pub fn tiny_png() -> Vec<u8> {
    let frame = image::RgbaImage::from_pixel(64, 64, image::Rgba([255, 0, 0, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(frame)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
    bytes
}

// ---------------------------------------------------------------------------
// Seed helpers
// ---------------------------------------------------------------------------

pub async fn seed_user(pool: &PgPool, email: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            display_name: "Test Photographer".to_string(),
        },
    )
    .await
    .unwrap()
}

pub async fn seed_event(pool: &PgPool, owner: i64) -> Event {
    EventRepo::create(
        pool,
        &CreateEvent {
            owner_user_id: owner,
            name: "Harbor Half".to_string(),
            watermark_text: None,
            auto_retouch_enabled: None,
            face_search_enabled: None,
            label_detection_enabled: None,
            start_numbers: None,
        },
    )
    .await
    .unwrap()
}

pub async fn give_credits(pool: &PgPool, user_id: i64, amount: i32) {
    CreditRepo::record_purchase(pool, user_id, amount, Some("Test top-up"))
        .await
        .unwrap();
}
