//! Common traits for avatar storage

use async_trait::async_trait;

use crate::error::Result;
use crate::media::ImageFile;

/// A bucket-like key/value store for binary objects
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Get the store name, used in logs
    fn name(&self) -> &str;

    /// Whether an object already exists under `key`
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Write `bytes` under `key`
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Publicly fetchable URL of the object stored under `key`
    fn public_url(&self, key: &str) -> String;

    /// Fetch an object previously returned by `public_url`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Uploads avatars and retrieves them again for generation
#[async_trait]
pub trait AssetUploader: Send + Sync {
    /// Store the file and return its remote URL
    async fn upload(&self, file: &ImageFile) -> Result<String>;

    /// Retrieve a previously uploaded avatar
    async fn fetch(&self, remote_url: &str) -> Result<ImageFile>;
}
