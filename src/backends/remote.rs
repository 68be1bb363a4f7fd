//! Segmentation over HTTP
//!
//! Posts the upload as multipart field `file` to a rembg-compatible endpoint
//! and returns the response body, which must be the RGBA cutout.

use crate::config::SegmenterConfig;
use crate::error::{BgError, Result};
use crate::segmentation::Segmenter;
use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Longest response body excerpt quoted in error messages
const ERROR_BODY_EXCERPT: usize = 200;

/// Client for a remote segmentation service
#[derive(Debug, Clone)]
pub struct RemoteSegmenter {
    client: Client,
    endpoint: String,
    model: String,
}

impl RemoteSegmenter {
    /// Create a client from configuration
    ///
    /// # Errors
    /// - `InvalidConfig` when no URL is configured or the HTTP client cannot be built
    pub fn new(config: &SegmenterConfig) -> Result<Self> {
        let endpoint = config
            .url
            .clone()
            .ok_or_else(|| BgError::invalid_config("remote segmenter requires a url"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BgError::invalid_config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Segmenter for RemoteSegmenter {
    fn name(&self) -> &str {
        "remote"
    }

    async fn segment(&self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        let part = multipart::Part::bytes(image_bytes.to_vec()).file_name("upload");
        let form = multipart::Form::new().part("file", part);

        debug!(endpoint = %self.endpoint, model = %self.model, bytes = image_bytes.len(), "Requesting segmentation");

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("model", self.model.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    BgError::segmentation_unavailable(format!(
                        "segmentation service at {} unreachable: {}",
                        self.endpoint, e
                    ))
                } else {
                    BgError::segmentation(format!("segmentation request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(ERROR_BODY_EXCERPT).collect();
            let message = format!("segmentation service returned {}: {}", status, excerpt);
            return Err(if status == StatusCode::SERVICE_UNAVAILABLE {
                BgError::segmentation_unavailable(message)
            } else {
                BgError::segmentation(message)
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BgError::segmentation(format!("failed to read segmentation response: {}", e)))?;

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmenterKind;

    fn config(url: Option<&str>) -> SegmenterConfig {
        SegmenterConfig {
            kind: SegmenterKind::Remote,
            url: url.map(str::to_owned),
            ..SegmenterConfig::default()
        }
    }

    #[test]
    fn test_requires_url() {
        let err = RemoteSegmenter::new(&config(None)).unwrap_err();
        assert!(matches!(err, BgError::InvalidConfig(_)));
    }

    #[test]
    fn test_carries_model_and_endpoint() {
        let segmenter = RemoteSegmenter::new(&config(Some("http://127.0.0.1:7000/api/remove"))).unwrap();
        assert_eq!(segmenter.endpoint(), "http://127.0.0.1:7000/api/remove");
        assert_eq!(segmenter.model(), "isnet-general-use");
        assert_eq!(segmenter.name(), "remote");
    }

    #[tokio::test]
    async fn test_unreachable_service_maps_to_unavailable() {
        // Port 9 (discard) on localhost is not expected to accept HTTP connections
        let segmenter = RemoteSegmenter::new(&config(Some("http://127.0.0.1:9/api/remove"))).unwrap();
        let err = segmenter.segment(b"bytes").await.unwrap_err();
        assert!(matches!(err, BgError::SegmentationUnavailable(_)), "{err}");
    }
}
