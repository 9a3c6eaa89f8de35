//! Environment-driven configuration for the API binary.
//!
//! Everything is read once at startup; misconfiguration panics
//! immediately rather than surfacing as runtime errors later.

use std::time::Duration;

use finishpix_pipeline::PipelineConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `60`; batch uploads
    /// carry full-resolution bodies).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight pipeline work (default: `30`).
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `8080`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `60`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
        }
    }
}

/// Which object storage backend to wire at startup.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// Filesystem-backed storage rooted at a local directory.
    Local { root: String },
    /// An S3 bucket, using the ambient AWS credential chain.
    S3 { bucket: String },
}

impl StorageConfig {
    /// Load the storage backend selection from environment variables.
    ///
    /// | Env Var              | Default         |
    /// |----------------------|-----------------|
    /// | `STORAGE_BACKEND`    | `local`         |
    /// | `STORAGE_LOCAL_ROOT` | `./data/photos` |
    /// | `S3_BUCKET`          | required when `STORAGE_BACKEND=s3` |
    pub fn from_env() -> Self {
        let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".into());
        match backend.as_str() {
            "local" => Self::Local {
                root: std::env::var("STORAGE_LOCAL_ROOT")
                    .unwrap_or_else(|_| "./data/photos".into()),
            },
            "s3" => Self::S3 {
                bucket: std::env::var("S3_BUCKET")
                    .expect("S3_BUCKET must be set when STORAGE_BACKEND=s3"),
            },
            other => panic!("STORAGE_BACKEND must be 'local' or 's3', got '{other}'"),
        }
    }
}

/// Endpoints and credentials for the vision providers.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Base URL of the cloud vision provider (`VISION_API_URL`, required).
    pub api_url: String,
    /// API key for the cloud vision provider (`VISION_API_KEY`, required).
    pub api_key: String,
    /// Base URL of the on-site OCR sidecar (`LOCAL_OCR_URL`,
    /// default `http://127.0.0.1:9090`).
    pub local_ocr_url: String,
}

impl VisionConfig {
    /// Load vision endpoints from environment variables.
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("VISION_API_URL").expect("VISION_API_URL must be set"),
            api_key: std::env::var("VISION_API_KEY").expect("VISION_API_KEY must be set"),
            local_ocr_url: std::env::var("LOCAL_OCR_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:9090".into()),
        }
    }
}

/// Pipeline tunables from the environment, layered over the crate
/// defaults.
///
/// | Env Var                 | Default |
/// |-------------------------|---------|
/// | `MAX_CONCURRENT_PHOTOS` | `4`     |
/// | `BLUR_THRESHOLD`        | `28.0`  |
/// | `CREDITS_PER_PHOTO`     | `3`     |
/// | `CLUSTER_DEBOUNCE_SECS` | `30`    |
pub fn pipeline_config_from_env() -> PipelineConfig {
    let defaults = PipelineConfig::default();

    let max_concurrent: usize = std::env::var("MAX_CONCURRENT_PHOTOS")
        .map(|v| v.parse().expect("MAX_CONCURRENT_PHOTOS must be a valid usize"))
        .unwrap_or(defaults.max_concurrent);

    let blur_threshold: f32 = std::env::var("BLUR_THRESHOLD")
        .map(|v| v.parse().expect("BLUR_THRESHOLD must be a valid f32"))
        .unwrap_or(defaults.blur_threshold);

    let credits_per_photo: i32 = std::env::var("CREDITS_PER_PHOTO")
        .map(|v| v.parse().expect("CREDITS_PER_PHOTO must be a valid i32"))
        .unwrap_or(defaults.credits_per_photo);

    let cluster_debounce = std::env::var("CLUSTER_DEBOUNCE_SECS")
        .map(|v| {
            Duration::from_secs(v.parse().expect("CLUSTER_DEBOUNCE_SECS must be a valid u64"))
        })
        .unwrap_or(defaults.cluster_debounce);

    PipelineConfig {
        max_concurrent,
        blur_threshold,
        credits_per_photo,
        cluster_debounce,
        ..defaults
    }
}
