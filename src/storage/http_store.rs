//! Object store reached over HTTP (S3-style PUT/HEAD/GET on a bucket URL)

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use crate::storage::traits::ObjectStore;

/// HTTP bucket client
pub struct HttpObjectStore {
    client: Client,
    bucket_url: String,
    public_url: String,
}

impl HttpObjectStore {
    /// Create a new HTTP store from configuration
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let bucket_url = config
            .bucket_url
            .clone()
            .ok_or_else(|| AppError::Internal("storage.bucket_url is not configured".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let public_url = config.public_url.clone().unwrap_or_else(|| bucket_url.clone());

        Ok(Self::with_client(client, bucket_url, public_url))
    }

    pub fn with_client(client: Client, bucket_url: String, public_url: String) -> Self {
        Self {
            client,
            bucket_url: bucket_url.trim_end_matches('/').to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.bucket_url, key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let response = self.client.head(self.object_url(key)).send().await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                warn!(key = %key, status = %status, "Unexpected status probing bucket");
                Err(AppError::Upload(format!("bucket returned {} for HEAD {}", status, key)))
            }
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let size = bytes.len();
        let response = self
            .client
            .put(self.object_url(key))
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upload(format!("bucket returned {}: {}", status, body)));
        }

        debug!(key = %key, size, "Uploaded object");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }
        if !status.is_success() {
            return Err(AppError::Upload(format!("bucket returned {} fetching {}", status, url)));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
