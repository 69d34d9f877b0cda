//! Inference service adapter
//!
//! ## Responsibilities
//!
//! - Send the captured frame to the hosted detection endpoint
//! - Parse the `predictions` response into `Detection` values
//!
//! The service speaks center-coordinate geometry: each prediction carries
//! the box center plus width/height in pixels.

use crate::capture::CapturedFrame;
use crate::error::{Error, Result};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

/// One detection returned by the inference service. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_label: String,
    pub confidence: f32,
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Deserialize)]
struct InferResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    #[serde(rename = "class")]
    class_label: String,
    confidence: f32,
}

impl From<Prediction> for Detection {
    fn from(p: Prediction) -> Self {
        Self {
            class_label: p.class_label,
            confidence: p.confidence,
            center_x: p.x,
            center_y: p.y,
            width: p.width,
            height: p.height,
        }
    }
}

/// Inference HTTP client, held for the process lifetime
pub struct ClassifierClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model_id: String,
}

impl ClassifierClient {
    pub fn new(base_url: String, api_key: String, model_id: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            api_key,
            model_id,
        }
    }

    /// Run inference on a captured frame. Single attempt; any transport or
    /// service error is cycle-fatal for the caller.
    pub async fn infer(&self, frame: &CapturedFrame) -> Result<Vec<Detection>> {
        let url = format!("{}/{}", self.base_url, self.model_id);

        let form = Form::new().part(
            "file",
            Part::bytes(frame.jpeg.clone())
                .file_name("snapshot.jpg")
                .mime_str("image/jpeg")
                .map_err(|e| Error::Inference(format!("multipart build failed: {}", e)))?,
        );

        let resp = self
            .client
            .post(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("transport error: {}", e)))?;

        if !resp.status().is_success() {
            return Err(Error::Inference(format!(
                "inference service returned {}",
                resp.status()
            )));
        }

        let body: InferResponse = resp
            .json()
            .await
            .map_err(|e| Error::Inference(format!("response decode failed: {}", e)))?;

        tracing::info!(
            predictions = body.predictions.len(),
            "Inference completed"
        );

        Ok(body.predictions.into_iter().map(Detection::from).collect())
    }
}
