//! Scene Studio
//!
//! Server side of an avatar scene wizard: the user uploads a reference image,
//! picks a style, a color palette and a clothing focus, optionally describes
//! the scene, and the service asks a generative-image API for the result.
//! The vendor API key stays here and never reaches the browser.

pub mod api;
pub mod config;
pub mod error;
pub mod generation;
pub mod media;
pub mod middleware;
pub mod prompt;
pub mod storage;
pub mod view;

pub use error::{AppError, Result};

use std::sync::Arc;

use generation::{GenerationClient, RetryPolicy, SceneGenerator};
use prompt::PromptComposer;
use storage::{AssetUploader, ContentAddressedUploader};
use view::{SessionStore, WizardDeps};

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    /// Wire the object store, uploader and generation client from settings
    pub fn from_settings(settings: config::Settings) -> Result<Self> {
        let store = storage::store_from_config(&settings.storage)?;
        let uploader: Arc<dyn AssetUploader> = Arc::new(ContentAddressedUploader::new(store));
        let generator: Arc<dyn SceneGenerator> = Arc::new(GenerationClient::new(
            settings.generation.clone(),
            RetryPolicy::from_config(&settings.retry),
            uploader.clone(),
        )?);

        Ok(Self::with_deps(settings, uploader, generator))
    }

    pub fn with_deps(
        settings: config::Settings,
        uploader: Arc<dyn AssetUploader>,
        generator: Arc<dyn SceneGenerator>,
    ) -> Self {
        let deps = WizardDeps {
            uploader,
            generator,
            composer: PromptComposer::default(),
            min_action_interval: settings.view.min_action_interval(),
        };

        let sessions = SessionStore::new(deps, settings.view.session_ttl());
        Self {
            settings: Arc::new(settings),
            sessions: Arc::new(sessions),
        }
    }
}
