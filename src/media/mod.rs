//! Media handling - base64 payloads and the avatar image encoder

pub mod base64;
pub mod encoder;

pub use encoder::{encode, encode_path, EncodedImage, ImageFile};
