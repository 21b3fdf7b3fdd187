//! Base64 and data URI helpers

use base64::{engine::general_purpose::STANDARD, Engine};

/// Encode binary data to base64 string
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Build a data URI from an already-encoded payload
pub fn data_uri(mime_type: &str, encoded: &str) -> String {
    format!("data:{};base64,{}", mime_type, encoded)
}
