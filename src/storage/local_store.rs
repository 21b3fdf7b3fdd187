//! Object store backed by a local directory

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::storage::traits::ObjectStore;

/// Stores objects as files below `base_path`, addressed by `url_prefix`
pub struct LocalObjectStore {
    base_path: PathBuf,
    url_prefix: String,
}

impl LocalObjectStore {
    pub fn new(base_path: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let url_prefix: String = url_prefix.into();
        Self {
            base_path: base_path.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Map an object key to its file path, refusing keys that escape the base directory
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(AppError::InvalidRequest(format!("Invalid object key: {}", key)));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&path, &bytes).await?;
        debug!(path = ?path, size = bytes.len(), "Stored object");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.url_prefix, key)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let key = url
            .strip_prefix(&self.url_prefix)
            .map(|k| k.trim_start_matches('/'))
            .ok_or_else(|| AppError::InvalidRequest(format!("URL not served by this store: {}", url)))?;

        let path = self.path_for(key)?;
        Ok(fs::read(&path).await?)
    }
}
