//! Frame capture from the local camera
//!
//! ## Responsibilities
//!
//! - One-shot V4L2 capture using ffmpeg (open/read/release per call, no
//!   handle held across cycles)
//! - Warm-up frame discard to skip the device's initial black/corrupt frames
//! - Timestamped save of the kept frame plus an in-memory decode so
//!   downstream stages avoid a redundant disk read

use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use image::RgbaImage;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;

/// One captured frame: where it was saved, decoded pixels, and the raw JPEG.
///
/// Owned by the cycle and never mutated after capture; the annotator works
/// on a clone of the pixels.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub path: PathBuf,
    pub pixels: RgbaImage,
    pub jpeg: Vec<u8>,
}

/// Camera capture service
pub struct CaptureService {
    camera_index: u32,
    warmup_frames: u32,
    timeout_secs: u64,
    captures_dir: PathBuf,
}

impl CaptureService {
    pub fn new(
        camera_index: u32,
        warmup_frames: u32,
        timeout_secs: u64,
        captures_dir: PathBuf,
    ) -> Self {
        Self {
            camera_index,
            warmup_frames,
            timeout_secs,
            captures_dir,
        }
    }

    /// Capture exactly one usable frame.
    ///
    /// ffmpeg emits `warmup + 1` MJPEG frames on stdout and only the last is
    /// kept, standing in for the discarded warm-up reads a held camera
    /// handle would do. Uses kill_on_drop so a timeout cannot leave a
    /// lingering ffmpeg process behind an unresponsive device.
    pub async fn capture(&self) -> Result<CapturedFrame> {
        let device = format!("/dev/video{}", self.camera_index);
        let frames = self.warmup_frames + 1;

        let child = Command::new("ffmpeg")
            .args([
                "-f",
                "v4l2",
                "-i",
                &device,
                "-frames:v",
                &frames.to_string(),
                "-f",
                "image2pipe",
                "-vcodec",
                "mjpeg",
                "-loglevel",
                "error",
                "-y",
                "-",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Capture(format!("ffmpeg spawn failed: {}", e)))?;

        let timeout = Duration::from_secs(self.timeout_secs);
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(Error::Capture(format!("ffmpeg execution failed: {}", e)));
            }
            Err(_) => {
                tracing::warn!(
                    timeout_sec = self.timeout_secs,
                    device = %device,
                    "ffmpeg timeout, process killed via kill_on_drop"
                );
                return Err(Error::Capture(format!(
                    "camera {} timed out after {}s",
                    device, self.timeout_secs
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Capture(format!(
                "cannot open camera {}: {}",
                device,
                stderr.trim()
            )));
        }

        let jpeg = last_jpeg_frame(&output.stdout)
            .ok_or_else(|| Error::Capture(format!("no complete frame from camera {}", device)))?;

        let pixels = image::load_from_memory(&jpeg)
            .map_err(|e| Error::Capture(format!("frame decode failed: {}", e)))?
            .into_rgba8();

        fs::create_dir_all(&self.captures_dir).await?;
        let path = self.captures_dir.join(capture_filename(Local::now()));
        fs::write(&path, &jpeg).await?;

        tracing::info!(
            path = %path.display(),
            size = jpeg.len(),
            width = pixels.width(),
            height = pixels.height(),
            "Image captured"
        );

        Ok(CapturedFrame { path, pixels, jpeg })
    }
}

/// Filename for a raw capture, local-time derived
fn capture_filename(now: DateTime<Local>) -> String {
    format!("{}.jpg", now.format("%Y%m%d_%H%M%S"))
}

/// Extract the last complete JPEG (SOI..EOI) from a concatenated MJPEG
/// stream. Returns None when no complete frame is present.
fn last_jpeg_frame(data: &[u8]) -> Option<Vec<u8>> {
    const SOI: [u8; 2] = [0xFF, 0xD8];
    const EOI: [u8; 2] = [0xFF, 0xD9];

    let last_eoi = data
        .windows(2)
        .rposition(|w| w == EOI)
        .map(|pos| pos + 2)?;
    let last_soi = data[..last_eoi].windows(2).rposition(|w| w == SOI)?;

    if last_eoi - last_soi < 4 {
        return None;
    }
    Some(data[last_soi..last_eoi].to_vec())
}
