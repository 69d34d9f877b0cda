//! Error handling for plantwatch

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
///
/// Severity is decided by the monitor loop, not here: capture and inference
/// errors abort the remainder of a cycle, everything else degrades the
/// reading and the cycle continues.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Camera device could not be opened or returned no usable frame
    #[error("Capture error: {0}")]
    Capture(String),

    /// Inference service transport or service error
    #[error("Inference error: {0}")]
    Inference(String),

    /// Image host upload error
    #[error("Publish error: {0}")]
    Publish(String),

    /// Document store write error
    #[error("Persist error: {0}")]
    Persist(String),

    /// Individual sensor read error
    #[error("Sensor read error: {0}")]
    SensorRead(String),

    /// Sensor hardware not present (triggers simulation fallback at startup)
    #[error("Hardware unavailable: {0}")]
    HardwareUnavailable(String),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
