use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use finishpix_api::config::{
    pipeline_config_from_env, ServerConfig, StorageConfig, VisionConfig,
};
use finishpix_api::router::build_app_router;
use finishpix_api::state::AppState;
use finishpix_events::{ProgressHub, ProgressTracker};
use finishpix_pipeline::{ClusterScheduler, OverlayCache, PhotoPipeline, WorkerPool};
use finishpix_storage::{LocalStore, ObjectStore, S3Store};
use finishpix_vision::{CloudVisionClient, LocalOcrClient, VisionService};

/// Default log filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str =
    "finishpix_api=info,finishpix_pipeline=info,finishpix_db=info,tower_http=info,warn";

/// How often the session sweeper wakes up.
const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// How long a completed session stays queryable before it is forgotten.
const SESSION_RETENTION: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = finishpix_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    finishpix_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    finishpix_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    // --- Object storage ---
    let storage: Arc<dyn ObjectStore> = match StorageConfig::from_env() {
        StorageConfig::Local { root } => {
            tracing::info!(%root, "Using local object storage");
            Arc::new(
                LocalStore::create(&root)
                    .await
                    .context("Failed to prepare local storage root")?,
            )
        }
        StorageConfig::S3 { bucket } => {
            tracing::info!(%bucket, "Using S3 object storage");
            let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            Arc::new(S3Store::new(aws_sdk_s3::Client::new(&aws), bucket))
        }
    };

    // --- Vision providers ---
    let vision_config = VisionConfig::from_env();
    let vision = VisionService::new(
        CloudVisionClient::new(vision_config.api_url, vision_config.api_key),
        LocalOcrClient::new(vision_config.local_ocr_url),
    );

    // --- Pipeline ---
    let pipeline_config = pipeline_config_from_env();
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
    tracing::info!(
        max_concurrent = pipeline_config.max_concurrent,
        credits_per_photo = pipeline_config.credits_per_photo,
        "Pipeline ready"
    );

    // --- Session sweeper ---
    let sweeper_cancel = CancellationToken::new();
    let sweeper = tokio::spawn(session_sweeper(tracker.clone(), sweeper_cancel.clone()));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        storage,
        tracker,
        hub,
        pipeline,
        workers: workers.clone(),
        overlays,
        pipeline_config,
    };

    // --- Router ---
    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining pipeline work");

    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, drain_workers(&workers))
        .await
        .is_err()
    {
        tracing::warn!(
            in_flight = workers.in_flight(),
            queued = workers.queued(),
            "shutdown timeout reached with pipeline work outstanding"
        );
    }

    sweeper_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweeper).await;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Initialise the tracing subscriber. `RUST_LOG` overrides the default
/// filter; `LOG_FORMAT=json` switches to JSON lines for log shippers.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Periodically forget sessions that finished a while ago. Snapshot and
/// stream requests for them 404 afterwards. Runs until `cancel` is
/// triggered.
async fn session_sweeper(tracker: Arc<ProgressTracker>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                let swept = tracker.sweep_completed(SESSION_RETENTION).await;
                if swept > 0 {
                    tracing::debug!(swept, "swept completed upload sessions");
                }
            }
        }
    }
}

/// Resolve once the worker pool has no queued or running jobs.
async fn drain_workers(workers: &WorkerPool) {
    while workers.in_flight() + workers.queued() > 0 {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
