//! Image encoder: turns a selected file into a base64 payload and MIME type

use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::media::base64;

const FALLBACK_MIME: &str = "application/octet-stream";

/// A user-selected image, as read from disk or received over the wire
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a file from disk, surfacing failures as `ImageRead`
    pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .await
            .map_err(|e| AppError::ImageRead(format!("{}: {}", path.display(), e)))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("avatar")
            .to_string();

        debug!(path = ?path, size = bytes.len(), "Read image file");
        Ok(Self::new(file_name, bytes))
    }

    pub fn mime_type(&self) -> &'static str {
        detect_mime_type(&self.bytes, &self.file_name)
    }

    /// An empty upload is treated like an unreadable file
    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.bytes.is_empty() {
            return Err(AppError::ImageRead(format!("{} is empty", self.file_name)));
        }
        Ok(())
    }
}

/// Base64 payload ready to inline into a generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: String,
}

impl EncodedImage {
    pub fn to_data_uri(&self) -> String {
        base64::data_uri(&self.mime_type, &self.data)
    }
}

/// Encode an image file. Empty files are rejected.
pub fn encode(file: &ImageFile) -> Result<EncodedImage> {
    file.ensure_not_empty()?;

    Ok(EncodedImage {
        data: base64::encode(&file.bytes),
        mime_type: file.mime_type().to_string(),
    })
}

/// Read and encode in one step
pub async fn encode_path(path: impl AsRef<Path>) -> Result<EncodedImage> {
    let file = ImageFile::read(path).await?;
    encode(&file)
}

/// Detect the MIME type from magic bytes, then from the file extension
pub fn detect_mime_type(data: &[u8], file_name: &str) -> &'static str {
    sniff(data).unwrap_or_else(|| mime_from_extension(file_name).unwrap_or(FALLBACK_MIME))
}

/// File extension used for a stored object of this MIME type
pub fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        _ => "bin",
    }
}

fn sniff(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }

    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }

    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("image/gif");
    }

    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    if data.starts_with(b"BM") {
        return Some("image/bmp");
    }

    None
}

fn mime_from_extension(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}
