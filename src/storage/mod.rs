//! Storage module - object store backends and the avatar uploader

pub mod http_store;
pub mod local_store;
pub mod traits;
pub mod uploader;

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;

pub use traits::{AssetUploader, ObjectStore};
pub use uploader::ContentAddressedUploader;

/// Build the object store selected by configuration
pub fn store_from_config(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.backend {
        StorageBackend::Local => Arc::new(local_store::LocalObjectStore::new(
            config.base_path.clone(),
            config.url_prefix.clone(),
        )),
        StorageBackend::Http => Arc::new(http_store::HttpObjectStore::new(config)?),
    };
    Ok(store)
}
