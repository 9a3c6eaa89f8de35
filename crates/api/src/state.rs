use std::sync::Arc;

use finishpix_db::DbPool;
use finishpix_events::{ProgressHub, ProgressTracker};
use finishpix_pipeline::{OverlayCache, PhotoPipeline, PipelineConfig, WorkerPool};
use finishpix_storage::ObjectStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Object storage for originals, derived copies, and watermark images.
    pub storage: Arc<dyn ObjectStore>,
    /// In-memory progress state for upload sessions and live feeds.
    pub tracker: Arc<ProgressTracker>,
    /// Fan-out point the stream endpoints subscribe through.
    pub hub: Arc<ProgressHub>,
    /// The photo processing pipeline itself.
    pub pipeline: Arc<PhotoPipeline>,
    /// Bounded-concurrency pool the upload handlers submit jobs to.
    pub workers: Arc<WorkerPool>,
    /// Watermark overlay cache, invalidated when an event's custom
    /// watermark changes.
    pub overlays: Arc<OverlayCache>,
    /// Pipeline tunables; the handlers read `credits_per_photo` for
    /// batch pricing.
    pub pipeline_config: PipelineConfig,
}
