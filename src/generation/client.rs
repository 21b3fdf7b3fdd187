//! HTTP client for the generative-content endpoint

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::GenerationConfig;
use crate::error::{AppError, Result};
use crate::generation::retry::RetryPolicy;
use crate::generation::wire::{GenerateContentRequest, GenerateContentResponse, Part};
use crate::media::{self, base64, EncodedImage};
use crate::prompt::composer::ENHANCE_SYSTEM_INSTRUCTION;
use crate::prompt::{PromptComposer, SelectionSet};
use crate::storage::AssetUploader;

const API_KEY_HEADER: &str = "x-goog-api-key";
const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Everything sent for one generate action
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub composed_prompt: String,
    pub avatar: EncodedImage,
}

impl GenerationRequest {
    fn to_wire(&self) -> GenerateContentRequest {
        GenerateContentRequest::user(vec![
            Part::text(self.composed_prompt.clone()),
            Part::inline(self.avatar.mime_type.clone(), self.avatar.data.clone()),
        ])
        .with_response_modalities(&["IMAGE"])
    }
}

/// Scene generation as seen by the wizard
#[async_trait]
pub trait SceneGenerator: Send + Sync {
    /// Generate a scene for the avatar at `avatar_url`, returning a data URI
    async fn generate(
        &self,
        avatar_url: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String>;

    /// Expand the free-text idea into one descriptive paragraph
    async fn enhance_prompt(
        &self,
        selection: &SelectionSet,
        free_text: &str,
        cancel: &CancellationToken,
    ) -> Result<String>;
}

/// Client for the vendor API; holds the key so callers never see it
pub struct GenerationClient {
    http: Client,
    config: GenerationConfig,
    retry: RetryPolicy,
    uploader: Arc<dyn AssetUploader>,
    composer: PromptComposer,
}

impl GenerationClient {
    /// Create a new client from configuration
    pub fn new(
        config: GenerationConfig,
        retry: RetryPolicy,
        uploader: Arc<dyn AssetUploader>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            retry,
            uploader,
            composer: PromptComposer::default(),
        })
    }

    pub fn with_composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn model_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            model
        )
    }

    async fn post(&self, model: &str, body: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let response = self
            .http
            .post(self.model_url(model))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamStatus { status, body });
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| AppError::MalformedResponse(format!("invalid JSON: {}", e)))
    }

    /// One image generation call; returns a data URI
    async fn request_image(&self, request: &GenerateContentRequest) -> Result<String> {
        let response = self.post(&self.config.image_model, request).await?;
        let image = response.first_image().ok_or_else(|| {
            AppError::MalformedResponse("no inline image data in first candidate".to_string())
        })?;

        let mime_type = if image.mime_type.is_empty() {
            DEFAULT_IMAGE_MIME
        } else {
            image.mime_type.as_str()
        };
        Ok(base64::data_uri(mime_type, &image.data))
    }

    /// Send one image generation request with retries; returns a data URI
    pub async fn generate_image(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let body = &request.to_wire();

        self.retry
            .run("generate_scene", cancel, |_| self.request_image(body))
            .await
    }
}

#[async_trait]
impl SceneGenerator for GenerationClient {
    async fn generate(
        &self,
        avatar_url: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        info!(model = %self.config.image_model, avatar = %avatar_url, "Generating scene");

        // fetching the avatar is part of every attempt
        self.retry
            .run("generate_scene", cancel, |_| async move {
                let avatar = self.uploader.fetch(avatar_url).await?;
                let request = GenerationRequest {
                    composed_prompt: prompt.to_string(),
                    avatar: media::encode(&avatar)?,
                };
                debug!(mime_type = %request.avatar.mime_type, size = avatar.bytes.len(), "Encoded avatar");
                self.request_image(&request.to_wire()).await
            })
            .await
    }

    async fn enhance_prompt(
        &self,
        selection: &SelectionSet,
        free_text: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let body = GenerateContentRequest::user(vec![Part::text(
            self.composer.enhancement_request(selection, free_text),
        )])
        .with_system_instruction(ENHANCE_SYSTEM_INSTRUCTION);
        let body = &body;
        let model = self.config.text_model.as_str();

        debug!(model = %model, "Enhancing prompt");
        self.retry
            .run("enhance_prompt", cancel, |_| async move {
                let response = self.post(model, body).await?;
                response
                    .first_text()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::MalformedResponse("no text in first candidate".to_string()))
            })
            .await
    }
}
