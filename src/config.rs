//! Application configuration
//!
//! All settings come from the environment (a `.env` file is loaded by main
//! before this runs). Read once at startup, never reloaded mid-run.

use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Device identifier the reading log is scoped by
    pub plant_id: String,
    /// V4L2 camera index (/dev/video{N})
    pub camera_index: u32,
    /// Seconds between monitoring cycles
    pub interval_secs: u64,
    /// GPIO pin for the soil moisture sensor (BCM numbering)
    pub soil_sensor_pin: u8,
    /// GPIO pin for the DHT11 temperature/humidity sensor (BCM numbering)
    pub dht_sensor_pin: u8,
    /// Inference service base URL
    pub inference_url: String,
    /// Inference service API key
    pub inference_api_key: String,
    /// Inference model identifier
    pub inference_model_id: String,
    /// Image host upload endpoint
    pub imgbb_url: String,
    /// Image host API key
    pub imgbb_api_key: String,
    /// Firestore REST base URL
    pub firestore_url: String,
    /// Firestore project identifier
    pub firestore_project: String,
    /// Directory for raw captures
    pub captures_dir: PathBuf,
    /// Directory for annotated inference results
    pub results_dir: PathBuf,
    /// Warm-up frames discarded before the kept frame
    pub capture_warmup_frames: u32,
    /// ffmpeg timeout for a capture in seconds
    pub capture_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            plant_id: std::env::var("PLANT_ID").unwrap_or_else(|_| "plant-001".to_string()),
            camera_index: std::env::var("CAMERA_INDEX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            interval_secs: std::env::var("INTERVAL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            soil_sensor_pin: std::env::var("SOIL_SENSOR_PIN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(17),
            dht_sensor_pin: std::env::var("DHT_SENSOR_PIN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(14),
            inference_url: std::env::var("INFERENCE_URL")
                .unwrap_or_else(|_| "https://detect.roboflow.com".to_string()),
            inference_api_key: std::env::var("INFERENCE_API_KEY").unwrap_or_default(),
            inference_model_id: std::env::var("INFERENCE_MODEL_ID").unwrap_or_default(),
            imgbb_url: std::env::var("IMGBB_URL")
                .unwrap_or_else(|_| "https://api.imgbb.com/1/upload".to_string()),
            imgbb_api_key: std::env::var("IMGBB_API_KEY").unwrap_or_default(),
            firestore_url: std::env::var("FIRESTORE_URL")
                .unwrap_or_else(|_| "https://firestore.googleapis.com/v1".to_string()),
            firestore_project: std::env::var("FIRESTORE_PROJECT")
                .unwrap_or_else(|_| "plantwatch".to_string()),
            captures_dir: std::env::var("CAPTURES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("captured_images")),
            results_dir: std::env::var("RESULTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("inference_results")),
            capture_warmup_frames: std::env::var("CAPTURE_WARMUP_FRAMES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            capture_timeout_secs: std::env::var("CAPTURE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        }
    }
}
