//! plantwatch - Unattended Plant Monitoring
//!
//! Main entry point: configuration, service construction, monitor loop.

use plantwatch::capture::CaptureService;
use plantwatch::classifier::ClassifierClient;
use plantwatch::config::AppConfig;
use plantwatch::orchestrator::MonitorLoop;
use plantwatch::publisher::ImagePublisher;
use plantwatch::sensors;
use plantwatch::store::ReadingStore;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plantwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting plantwatch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        plant_id = %config.plant_id,
        camera_index = config.camera_index,
        interval_secs = config.interval_secs,
        captures_dir = %config.captures_dir.display(),
        results_dir = %config.results_dir.display(),
        "Configuration loaded"
    );

    tokio::fs::create_dir_all(&config.captures_dir).await?;
    tokio::fs::create_dir_all(&config.results_dir).await?;

    // One-time sensor mode selection (hardware or simulation)
    let sensor_reader = sensors::init_reader(&config);
    tracing::info!(mode = sensor_reader.mode(), "Sensor reader initialized");

    let capture = CaptureService::new(
        config.camera_index,
        config.capture_warmup_frames,
        config.capture_timeout_secs,
        config.captures_dir.clone(),
    );

    let classifier = ClassifierClient::new(
        config.inference_url.clone(),
        config.inference_api_key.clone(),
        config.inference_model_id.clone(),
    );
    tracing::info!(url = %config.inference_url, model = %config.inference_model_id, "Classifier client initialized");

    let publisher = ImagePublisher::new(config.imgbb_url.clone(), config.imgbb_api_key.clone());

    let store = ReadingStore::new(
        config.firestore_url.clone(),
        config.firestore_project.clone(),
        config.plant_id.clone(),
    );
    tracing::info!(project = %config.firestore_project, "Reading store initialized");

    let monitor = MonitorLoop::new(
        sensor_reader,
        capture,
        classifier,
        publisher,
        store,
        config.results_dir.clone(),
        Duration::from_secs(config.interval_secs),
    );

    monitor.run().await;

    tracing::info!("plantwatch terminated");
    Ok(())
}
