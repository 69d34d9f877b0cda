//! Monitoring cycle orchestrator
//!
//! ## Responsibilities
//!
//! - Sequential stage execution: sensors, capture, inference, evaluation,
//!   annotation, publish, persist
//! - Per-stage failure isolation: capture and inference abort the cycle
//!   (no reading), everything else degrades the reading and continues
//! - Sleep-after-cycle loop: a full interval elapses between the end of
//!   one cycle and the start of the next, interrupted only by ctrl-c
#![allow(async_fn_in_trait)]

use crate::annotator;
use crate::capture::CapturedFrame;
use crate::classifier::Detection;
use crate::error::Result;
use crate::health;
use crate::sensors::SensorReader;
use crate::store::Reading;
use chrono::{SubsecRound, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Frame acquisition stage contract
pub trait FrameSource {
    async fn capture(&self) -> Result<CapturedFrame>;
}

/// Inference stage contract
pub trait Inference {
    async fn infer(&self, frame: &CapturedFrame) -> Result<Vec<Detection>>;
}

/// Image hosting stage contract (soft-fail by construction)
pub trait ImageHost {
    async fn publish(&self, path: &Path) -> Option<String>;
}

/// Reading persistence stage contract
pub trait ReadingSink {
    async fn append(&self, reading: &Reading) -> Result<()>;
}

impl FrameSource for crate::capture::CaptureService {
    async fn capture(&self) -> Result<CapturedFrame> {
        crate::capture::CaptureService::capture(self).await
    }
}

impl Inference for crate::classifier::ClassifierClient {
    async fn infer(&self, frame: &CapturedFrame) -> Result<Vec<Detection>> {
        crate::classifier::ClassifierClient::infer(self, frame).await
    }
}

impl ImageHost for crate::publisher::ImagePublisher {
    async fn publish(&self, path: &Path) -> Option<String> {
        crate::publisher::ImagePublisher::publish(self, path).await
    }
}

impl ReadingSink for crate::store::ReadingStore {
    async fn append(&self, reading: &Reading) -> Result<()> {
        crate::store::ReadingStore::append(self, reading).await
    }
}

/// The monitoring loop. Holds all process-lifetime handles, injected once
/// at startup; stages run sequentially on the single control flow with no
/// overlapping cycles.
pub struct MonitorLoop<C, I, P, S> {
    sensors: Box<dyn SensorReader>,
    capture: C,
    classifier: I,
    publisher: P,
    store: S,
    results_dir: PathBuf,
    interval: Duration,
}

impl<C, I, P, S> MonitorLoop<C, I, P, S>
where
    C: FrameSource,
    I: Inference,
    P: ImageHost,
    S: ReadingSink,
{
    pub fn new(
        sensors: Box<dyn SensorReader>,
        capture: C,
        classifier: I,
        publisher: P,
        store: S,
        results_dir: PathBuf,
        interval: Duration,
    ) -> Self {
        Self {
            sensors,
            capture,
            classifier,
            publisher,
            store,
            results_dir,
            interval,
        }
    }

    /// Drive cycles until interrupted: one full cycle, then the fixed
    /// interval sleep, so the next cycle never begins before the interval
    /// has elapsed after the previous cycle's last stage. A failed cycle is
    /// logged and the loop proceeds. Returns only on ctrl-c, after which
    /// held handles drop; an interrupt arriving mid-cycle is observed at
    /// the next cycle boundary.
    pub async fn run(mut self) {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Monitor loop started"
        );

        loop {
            if let Err(e) = self.run_cycle().await {
                tracing::error!(error = %e, "Cycle failed");
            }

            tracing::debug!(
                sleep_secs = self.interval.as_secs(),
                "Sleeping until next cycle"
            );

            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Interrupt received, stopping monitor loop");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    /// One complete monitoring cycle.
    ///
    /// The pipeline shape never branches on earlier results: downstream
    /// fields are optional instead. An error return here means a cycle-fatal
    /// stage failed and no reading was emitted.
    pub async fn run_cycle(&mut self) -> Result<()> {
        tracing::info!("Starting monitoring cycle");

        // Sensors never fail; missing hardware degrades to absent fields.
        let snapshot = self.sensors.read();
        tracing::info!(
            temperature = ?snapshot.temperature,
            humidity = ?snapshot.humidity,
            soil = ?snapshot.soil_moisture.map(|s| s.as_str()),
            "Sensor snapshot"
        );

        // Capture and inference are hard dependencies for the rest of the
        // cycle: on failure the cycle aborts and no reading is emitted.
        let frame = self.capture.capture().await?;
        let detections = self.classifier.infer(&frame).await?;

        let verdict = health::evaluate(&detections);
        tracing::info!(
            status = %verdict.status,
            classes = ?verdict.observed_classes,
            "Health verdict"
        );

        // Annotation and publishing degrade to a reading without an image
        // URL; nothing past this point aborts the cycle.
        let image_url = match annotator::annotate(&frame, &detections, &self.results_dir) {
            Ok(annotated) => self.publisher.publish(&annotated).await,
            Err(e) => {
                tracing::error!(error = %e, "Annotation failed, reading carries no image URL");
                None
            }
        };

        let reading = Reading {
            timestamp: Utc::now().trunc_subsecs(0),
            temperature: snapshot.temperature,
            humidity: snapshot.humidity,
            soil_moisture: snapshot.soil_moisture,
            plant_status: verdict.status,
            detected_classes: verdict.observed_classes,
            image_url,
        };

        if let Err(e) = self.store.append(&reading).await {
            tracing::error!(error = %e, "Failed to persist reading");
        }

        tracing::info!("Cycle completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::health::HealthStatus;
    use crate::sensors::{SimulatedSensors, SoilState};
    use image::{Rgba, RgbaImage};
    use std::sync::{Arc, Mutex};

    struct StubCapture {
        fail: bool,
    }

    impl FrameSource for StubCapture {
        async fn capture(&self) -> Result<CapturedFrame> {
            if self.fail {
                return Err(Error::Capture("cannot open camera index 0".to_string()));
            }
            Ok(CapturedFrame {
                path: PathBuf::from("20260114_183734.jpg"),
                pixels: RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 255])),
                jpeg: Vec::new(),
            })
        }
    }

    struct StubInference {
        detections: Option<Vec<Detection>>,
    }

    impl Inference for StubInference {
        async fn infer(&self, _frame: &CapturedFrame) -> Result<Vec<Detection>> {
            self.detections
                .clone()
                .ok_or_else(|| Error::Inference("inference service returned 502".to_string()))
        }
    }

    struct StubHost {
        url: Option<String>,
    }

    impl ImageHost for StubHost {
        async fn publish(&self, _path: &Path) -> Option<String> {
            self.url.clone()
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        readings: Arc<Mutex<Vec<Reading>>>,
    }

    impl ReadingSink for RecordingSink {
        async fn append(&self, reading: &Reading) -> Result<()> {
            self.readings.lock().unwrap().push(reading.clone());
            Ok(())
        }
    }

    struct SlowCapture {
        cycle_time: Duration,
    }

    impl FrameSource for SlowCapture {
        async fn capture(&self) -> Result<CapturedFrame> {
            tokio::time::sleep(self.cycle_time).await;
            Ok(CapturedFrame {
                path: PathBuf::from("20260114_183734.jpg"),
                pixels: RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 255])),
                jpeg: Vec::new(),
            })
        }
    }

    #[derive(Clone, Default)]
    struct TimingSink {
        appended_at: Arc<Mutex<Vec<tokio::time::Instant>>>,
    }

    impl ReadingSink for TimingSink {
        async fn append(&self, _reading: &Reading) -> Result<()> {
            self.appended_at
                .lock()
                .unwrap()
                .push(tokio::time::Instant::now());
            Ok(())
        }
    }

    struct FailingSink;

    impl ReadingSink for FailingSink {
        async fn append(&self, _reading: &Reading) -> Result<()> {
            Err(Error::Persist("document store returned 503".to_string()))
        }
    }

    fn detection(label: &str) -> Detection {
        Detection {
            class_label: label.to_string(),
            confidence: 0.9,
            center_x: 32.0,
            center_y: 32.0,
            width: 16.0,
            height: 16.0,
        }
    }

    fn results_dir() -> PathBuf {
        std::env::temp_dir().join(format!("plantwatch-cycle-{}", std::process::id()))
    }

    fn monitor<C: FrameSource, I: Inference, P: ImageHost, S: ReadingSink>(
        capture: C,
        classifier: I,
        publisher: P,
        store: S,
    ) -> MonitorLoop<C, I, P, S> {
        MonitorLoop::new(
            Box::new(SimulatedSensors::new()),
            capture,
            classifier,
            publisher,
            store,
            results_dir(),
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn capture_failure_emits_no_reading() {
        let sink = RecordingSink::default();
        let mut m = monitor(
            StubCapture { fail: true },
            StubInference {
                detections: Some(vec![detection("healthy")]),
            },
            StubHost { url: None },
            sink.clone(),
        );

        let result = m.run_cycle().await;
        assert!(matches!(result, Err(Error::Capture(_))));
        assert!(sink.readings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn inference_failure_emits_no_reading() {
        let sink = RecordingSink::default();
        let mut m = monitor(
            StubCapture { fail: false },
            StubInference { detections: None },
            StubHost { url: None },
            sink.clone(),
        );

        let result = m.run_cycle().await;
        assert!(matches!(result, Err(Error::Inference(_))));
        assert!(sink.readings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn publish_failure_still_persists_a_degraded_reading() {
        let sink = RecordingSink::default();
        let mut m = monitor(
            StubCapture { fail: false },
            StubInference {
                detections: Some(vec![detection("blight"), detection("healthy")]),
            },
            StubHost { url: None },
            sink.clone(),
        );

        m.run_cycle().await.unwrap();

        let readings = sink.readings.lock().unwrap();
        assert_eq!(readings.len(), 1);
        let reading = &readings[0];
        assert_eq!(reading.image_url, None);
        assert_eq!(reading.plant_status, HealthStatus::Disease);
        assert_eq!(reading.detected_classes, vec!["blight", "healthy"]);
        // Sensor fields still populated from the simulated reader.
        assert_eq!(reading.temperature, Some(27.5));
        assert_eq!(reading.humidity, Some(60.0));
        assert_eq!(reading.soil_moisture, Some(SoilState::Moisture));
    }

    #[tokio::test]
    async fn successful_cycle_carries_the_public_url() {
        let sink = RecordingSink::default();
        let mut m = monitor(
            StubCapture { fail: false },
            StubInference {
                detections: Some(vec![detection("healthy")]),
            },
            StubHost {
                url: Some("https://i.example.com/abc.jpg".to_string()),
            },
            sink.clone(),
        );

        m.run_cycle().await.unwrap();

        let readings = sink.readings.lock().unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(
            readings[0].image_url,
            Some("https://i.example.com/abc.jpg".to_string())
        );
        assert_eq!(readings[0].plant_status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn empty_detections_persist_an_unknown_verdict() {
        let sink = RecordingSink::default();
        let mut m = monitor(
            StubCapture { fail: false },
            StubInference {
                detections: Some(Vec::new()),
            },
            StubHost { url: None },
            sink.clone(),
        );

        m.run_cycle().await.unwrap();

        let readings = sink.readings.lock().unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].plant_status, HealthStatus::Unknown);
        assert!(readings[0].detected_classes.is_empty());
    }

    #[tokio::test]
    async fn persist_failure_does_not_abort_the_cycle() {
        let mut m = monitor(
            StubCapture { fail: false },
            StubInference {
                detections: Some(vec![detection("healthy")]),
            },
            StubHost { url: None },
            FailingSink,
        );

        // Terminal step: failure is logged only.
        assert!(m.run_cycle().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn overrunning_cycle_is_followed_by_a_full_interval_sleep() {
        // 90s cycles against a 60s interval: the sleep starts only after
        // the cycle ends, so consecutive persists sit 150s apart. A fixed
        // period would leave just 90s between them.
        let sink = TimingSink::default();
        let m = MonitorLoop::new(
            Box::new(SimulatedSensors::new()),
            SlowCapture {
                cycle_time: Duration::from_secs(90),
            },
            StubInference {
                detections: Some(Vec::new()),
            },
            StubHost { url: None },
            sink.clone(),
            results_dir(),
            Duration::from_secs(60),
        );

        tokio::select! {
            _ = m.run() => unreachable!("loop only exits on interrupt"),
            _ = tokio::time::sleep(Duration::from_secs(400)) => {}
        }

        let appended = sink.appended_at.lock().unwrap();
        assert!(
            appended.len() >= 2,
            "expected at least two cycles in 400s, got {}",
            appended.len()
        );
        assert_eq!(appended[1] - appended[0], Duration::from_secs(150));
    }

    #[tokio::test]
    async fn reading_timestamp_has_second_precision() {
        let sink = RecordingSink::default();
        let mut m = monitor(
            StubCapture { fail: false },
            StubInference {
                detections: Some(Vec::new()),
            },
            StubHost { url: None },
            sink.clone(),
        );

        m.run_cycle().await.unwrap();

        use chrono::Timelike;
        let readings = sink.readings.lock().unwrap();
        assert_eq!(readings[0].timestamp.nanosecond(), 0);
    }
}
