//! External image hosting
//!
//! ## Responsibilities
//!
//! - Multipart upload of a local image file to the configured image host
//! - Soft failure: any transport error, non-200 status, or malformed
//!   response is logged and yields None, never an error to the caller

use crate::error::{Error, Result};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::path::Path;
use std::time::Duration;

/// Image host HTTP client, held for the process lifetime
pub struct ImagePublisher {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ImagePublisher {
    pub fn new(endpoint: String, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint,
            api_key,
        }
    }

    /// Upload a local image, returning its public URL or None on any failure.
    pub async fn publish(&self, path: &Path) -> Option<String> {
        match self.upload(path).await {
            Ok(url) => {
                tracing::info!(url = %url, "Image uploaded");
                Some(url)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %path.display(),
                    "Image upload failed"
                );
                None
            }
        }
    }

    async fn upload(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Publish(format!("cannot read {}: {}", path.display(), e)))?;

        let form = Form::new().part(
            "image",
            Part::bytes(bytes)
                .file_name("image.jpg")
                .mime_str("image/jpeg")
                .map_err(|e| Error::Publish(format!("multipart build failed: {}", e)))?,
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Publish(format!("transport error: {}", e)))?;

        // Success is HTTP 200 plus a URL in the body, nothing else.
        if resp.status() != StatusCode::OK {
            return Err(Error::Publish(format!(
                "image host returned {}",
                resp.status()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Publish(format!("response decode failed: {}", e)))?;

        extract_url(&body).ok_or_else(|| Error::Publish("no url in upload response".to_string()))
    }
}

/// Pull `data.url` out of the upload response body
pub(crate) fn extract_url(body: &serde_json::Value) -> Option<String> {
    body.get("data")?.get("url")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_url_from_success_body() {
        let body = json!({"data": {"url": "https://i.example.com/abc123.jpg", "id": "abc123"}});
        assert_eq!(
            extract_url(&body),
            Some("https://i.example.com/abc123.jpg".to_string())
        );
    }

    #[test]
    fn missing_or_malformed_fields_yield_none() {
        assert_eq!(extract_url(&json!({})), None);
        assert_eq!(extract_url(&json!({"data": {}})), None);
        assert_eq!(extract_url(&json!({"data": {"url": 42}})), None);
        assert_eq!(extract_url(&json!({"url": "https://top-level.example"})), None);
    }

    #[tokio::test]
    async fn missing_local_file_is_soft() {
        let publisher = ImagePublisher::new(
            "https://api.example.invalid/upload".to_string(),
            "key".to_string(),
        );
        let url = publisher.publish(Path::new("/nonexistent/image.jpg")).await;
        assert_eq!(url, None);
    }
}
