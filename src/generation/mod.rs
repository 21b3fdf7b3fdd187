//! Generation module - vendor wire types, retry policy and the API client

pub mod client;
pub mod retry;
pub mod wire;

pub use client::{GenerationClient, GenerationRequest, SceneGenerator};
pub use retry::RetryPolicy;
