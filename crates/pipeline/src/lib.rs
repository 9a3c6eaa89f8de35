//! Asynchronous photo-processing pipeline.
//!
//! Uploads are accepted instantly; the actual work happens here. A
//! bounded [`WorkerPool`] runs one task per photo, each task drives the
//! six-stage [`PhotoPipeline`], and a [`ClusterScheduler`] debounces the
//! provider-side face clustering run that follows a burst of uploads.

pub mod config;
pub mod credits;
pub mod debounce;
pub mod error;
pub mod executor;
pub mod job;
pub mod overlay_cache;
pub mod stages;
pub mod worker_pool;

pub use config::PipelineConfig;
pub use credits::CreditReconciler;
pub use debounce::ClusterScheduler;
pub use error::{PipelineError, StageError};
pub use executor::{PhotoPipeline, PipelineOutcome};
pub use job::{PhotoJob, ProgressKey};
pub use overlay_cache::OverlayCache;
pub use worker_pool::WorkerPool;
