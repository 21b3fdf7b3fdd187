//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub storage: StorageConfig,
    pub generation: GenerationConfig,
    pub retry: RetryConfig,
    pub view: ViewConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30000
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_true() -> bool {
    true
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

fn default_rps() -> u32 {
    20
}

fn default_burst() -> u32 {
    40
}

/// Where avatars are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Directory on local disk, served under `url_prefix`
    Local,
    /// Remote bucket reachable over plain HTTP PUT/GET
    Http,
}

/// Object storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_path")]
    pub base_path: String,
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    /// Write endpoint of the bucket (http backend)
    #[serde(default)]
    pub bucket_url: Option<String>,
    /// Public read prefix, defaults to `bucket_url`
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default = "default_storage_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_avatar_bytes")]
    pub max_avatar_bytes: usize,
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Local
}

fn default_storage_path() -> String {
    "./avatars".to_string()
}

fn default_url_prefix() -> String {
    "http://localhost:8080/assets".to_string()
}

fn default_storage_timeout() -> u64 {
    30000
}

fn default_max_avatar_bytes() -> usize {
    2 * 1024 * 1024
}

/// Generative endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Never committed; supplied through the environment
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_generation_timeout")]
    pub timeout_ms: u64,
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image-preview".to_string()
}

fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_generation_timeout() -> u64 {
    120000
}

/// Retry policy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay() -> u64 {
    1000
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Wizard behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewConfig {
    /// Minimum time between two accepted generate/enhance actions
    #[serde(default = "default_min_action_interval")]
    pub min_action_interval_ms: u64,
    /// Sessions idle for longer than this are dropped
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_session_sweep_interval")]
    pub session_sweep_interval_secs: u64,
}

fn default_min_action_interval() -> u64 {
    4000
}

fn default_session_ttl() -> u64 {
    3600
}

fn default_session_sweep_interval() -> u64 {
    60
}

impl ViewConfig {
    pub fn min_action_interval(&self) -> Duration {
        Duration::from_millis(self.min_action_interval_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("server.request_timeout_ms", default_request_timeout() as i64)?
            .set_default("rate_limit.enabled", true)?
            .set_default("rate_limit.requests_per_second", default_rps() as i64)?
            .set_default("rate_limit.burst_size", default_burst() as i64)?
            .set_default("storage.backend", "local")?
            .set_default("generation.endpoint", default_endpoint())?
            .set_default("retry.max_attempts", default_max_attempts() as i64)?
            .set_default("retry.base_delay_ms", default_base_delay() as i64)?
            .set_default("view.min_action_interval_ms", default_min_action_interval() as i64)?
            .set_default("view.session_ttl_secs", default_session_ttl() as i64)?
            .set_default("view.session_sweep_interval_secs", default_session_sweep_interval() as i64)?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .add_source(File::with_name(path.as_ref().to_str().unwrap_or("config/default")).required(false))
            // Override with environment variables (SCENE_STUDIO__SECTION__KEY)
            .add_source(
                Environment::with_prefix("SCENE_STUDIO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }

        if self.view.session_sweep_interval_secs == 0 {
            return Err(invalid("view.session_sweep_interval_secs must be at least 1"));
        }

        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts must be at least 1"));
        }

        if self.generation.api_key.trim().is_empty() {
            return Err(invalid(
                "generation.api_key is not set; export SCENE_STUDIO__GENERATION__API_KEY",
            ));
        }

        if self.storage.backend == StorageBackend::Http && self.storage.bucket_url.is_none() {
            return Err(invalid("storage.bucket_url is required for the http backend"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> AppError {
    AppError::Config(config::ConfigError::Message(message.to_string()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_ms: default_request_timeout(),
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_second: default_rps(),
                burst_size: default_burst(),
            },
            storage: StorageConfig {
                backend: default_storage_backend(),
                base_path: default_storage_path(),
                url_prefix: default_url_prefix(),
                bucket_url: None,
                public_url: None,
                timeout_ms: default_storage_timeout(),
                max_avatar_bytes: default_max_avatar_bytes(),
            },
            generation: GenerationConfig {
                endpoint: default_endpoint(),
                api_key: String::new(),
                image_model: default_image_model(),
                text_model: default_text_model(),
                timeout_ms: default_generation_timeout(),
            },
            retry: RetryConfig {
                max_attempts: default_max_attempts(),
                base_delay_ms: default_base_delay(),
            },
            view: ViewConfig {
                min_action_interval_ms: default_min_action_interval(),
                session_ttl_secs: default_session_ttl(),
                session_sweep_interval_secs: default_session_sweep_interval(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}
