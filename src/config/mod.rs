//! Configuration module

pub mod settings;

pub use settings::{
    GenerationConfig, LoggingConfig, RateLimitConfig, RetryConfig, ServerConfig, Settings,
    StorageBackend, StorageConfig, ViewConfig,
};
