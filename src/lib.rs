//! plantwatch - Unattended Plant Monitoring
//!
//! ## Architecture (8 Components)
//!
//! 1. AppConfig - process configuration from the environment
//! 2. Sensors - environmental snapshot with simulation fallback
//! 3. CaptureService - one frame per cycle from the local camera
//! 4. ClassifierClient - hosted disease-detection inference
//! 5. Health - detection list to verdict reduction
//! 6. Annotator - bounding boxes and captions on the captured frame
//! 7. ImagePublisher / ReadingStore - external hosting and persistence
//! 8. MonitorLoop - cycle sequencing, failure isolation, interval drive
//!
//! ## Design Principles
//!
//! - One cycle is the unit of work; a bad cycle never kills the process
//! - Capture and inference failures abort a cycle; everything else
//!   degrades the reading instead of branching the pipeline
//! - All service handles are constructed once at startup and injected

pub mod annotator;
pub mod capture;
pub mod classifier;
pub mod config;
pub mod error;
pub mod health;
pub mod orchestrator;
pub mod publisher;
pub mod sensors;
pub mod store;

pub use error::{Error, Result};
