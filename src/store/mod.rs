//! Reading persistence to the remote document store
//!
//! ## Responsibilities
//!
//! - Compose the terminal per-cycle record
//! - Append it to the device-scoped reading log via the Firestore REST
//!   `createDocument` call (server assigns the document ID)
//!
//! Append-only: no read path, no uniqueness check, duplicates permitted.

use crate::error::{Error, Result};
use crate::health::HealthStatus;
use crate::sensors::SoilState;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::time::Duration;

/// Terminal record for one monitoring cycle. Created at most once per cycle,
/// never mutated or deleted by this system.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// UTC, second precision
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    pub soil_moisture: Option<SoilState>,
    pub plant_status: HealthStatus,
    pub detected_classes: Vec<String>,
    pub image_url: Option<String>,
}

/// Document store HTTP client, held for the process lifetime
pub struct ReadingStore {
    client: reqwest::Client,
    base_url: String,
    project: String,
    plant_id: String,
}

impl ReadingStore {
    pub fn new(base_url: String, project: String, plant_id: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            project,
            plant_id,
        }
    }

    /// Append one reading to the per-device log
    pub async fn append(&self, reading: &Reading) -> Result<()> {
        let url = format!(
            "{}/projects/{}/databases/(default)/documents/plants/{}/readings",
            self.base_url, self.project, self.plant_id
        );

        let resp = self
            .client
            .post(&url)
            .json(&encode_document(reading))
            .send()
            .await
            .map_err(|e| Error::Persist(format!("transport error: {}", e)))?;

        if !resp.status().is_success() {
            return Err(Error::Persist(format!(
                "document store returned {}",
                resp.status()
            )));
        }

        tracing::info!(
            plant_id = %self.plant_id,
            status = %reading.plant_status,
            image_url = ?reading.image_url,
            "Reading persisted"
        );

        Ok(())
    }
}

/// Encode a reading as a Firestore typed document. Absent fields become
/// explicit nulls so every reading carries the full schema.
pub(crate) fn encode_document(reading: &Reading) -> Value {
    let classes: Vec<Value> = reading
        .detected_classes
        .iter()
        .map(|c| json!({ "stringValue": c }))
        .collect();

    json!({
        "fields": {
            "timestamp": {
                "timestampValue": reading.timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
            },
            "temperature": double_or_null(reading.temperature),
            "humidity": double_or_null(reading.humidity),
            "soil_moisture": match reading.soil_moisture {
                Some(soil) => json!({ "stringValue": soil.as_str() }),
                None => null_value(),
            },
            "plant_status": { "stringValue": reading.plant_status.as_str() },
            "detected_classes": { "arrayValue": { "values": classes } },
            "image_url": match &reading.image_url {
                Some(url) => json!({ "stringValue": url }),
                None => null_value(),
            },
        }
    })
}

fn double_or_null(v: Option<f32>) -> Value {
    match v {
        Some(n) => json!({ "doubleValue": n }),
        None => null_value(),
    }
}

fn null_value() -> Value {
    json!({ "nullValue": null })
}
