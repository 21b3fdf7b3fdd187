//! Content-addressed avatar uploader
//!
//! Objects are keyed by the SHA-256 of their bytes, so identical content maps
//! to exactly one object and an existing object is never rewritten.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::media::encoder::{detect_mime_type, extension_for};
use crate::media::ImageFile;
use crate::storage::traits::{AssetUploader, ObjectStore};

const AVATAR_PREFIX: &str = "avatars";

/// Uploader that names objects after a hash of their content
pub struct ContentAddressedUploader {
    store: Arc<dyn ObjectStore>,
}

impl ContentAddressedUploader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Object key for a file: `avatars/<sha256>.<ext>`
    pub fn object_key(file: &ImageFile) -> String {
        let digest = Sha256::digest(&file.bytes);
        format!(
            "{}/{}.{}",
            AVATAR_PREFIX,
            hex::encode(digest),
            extension_for(file.mime_type())
        )
    }
}

#[async_trait]
impl AssetUploader for ContentAddressedUploader {
    async fn upload(&self, file: &ImageFile) -> Result<String> {
        file.ensure_not_empty()?;

        let key = Self::object_key(file);

        if self.store.exists(&key).await.map_err(into_upload_error)? {
            debug!(store = %self.store.name(), key = %key, "Avatar already stored");
        } else {
            self.store
                .put(&key, file.bytes.clone(), file.mime_type())
                .await
                .map_err(into_upload_error)?;
            info!(
                store = %self.store.name(),
                key = %key,
                file_name = %file.file_name,
                size = file.bytes.len(),
                "Uploaded avatar"
            );
        }

        Ok(self.store.public_url(&key))
    }

    async fn fetch(&self, remote_url: &str) -> Result<ImageFile> {
        let bytes = self.store.fetch(remote_url).await?;
        let file_name = remote_url.rsplit('/').next().unwrap_or("avatar").to_string();
        debug!(url = %remote_url, size = bytes.len(), mime = detect_mime_type(&bytes, &file_name), "Fetched avatar");
        Ok(ImageFile::new(file_name, bytes))
    }
}

fn into_upload_error(err: AppError) -> AppError {
    match err {
        AppError::Upload(_) => err,
        other => AppError::Upload(other.to_string()),
    }
}
