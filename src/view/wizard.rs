//! The scene wizard: four selection steps, two actions and a result pane.
//!
//! State lives behind a mutex that is only held for short synchronous
//! sections; uploads and generation calls run outside it. Each in-flight
//! action carries an id and a cancellation token, and a completion whose id
//! no longer matches the current one is dropped.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use parking_lot::Mutex;
use serde::Serialize;
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::generation::SceneGenerator;
use crate::media::ImageFile;
use crate::prompt::options::{Field, CLOTHING_FOCUS, PALETTES, STYLES};
use crate::prompt::{Choice, PromptComposer, SelectionSet, SelectionUpdate};
use crate::storage::AssetUploader;

/// What the result pane shows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ResultPane {
    #[default]
    Placeholder,
    Loading,
    Image(String),
    Error(String),
}

impl ResultPane {
    pub fn image_data_uri(&self) -> Option<&str> {
        match self {
            ResultPane::Image(uri) => Some(uri),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ResultPane::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// The uploaded reference image
#[derive(Debug, Clone, Serialize)]
pub struct AvatarAsset {
    pub file_name: String,
    pub mime_type: String,
    pub size: usize,
    pub remote_url: Option<String>,
}

/// Collaborators shared by every wizard instance
#[derive(Clone)]
pub struct WizardDeps {
    pub uploader: Arc<dyn AssetUploader>,
    pub generator: Arc<dyn SceneGenerator>,
    pub composer: PromptComposer,
    pub min_action_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    Generate,
    Enhance,
}

struct InFlight {
    id: u64,
    kind: ActionKind,
    cancel: CancellationToken,
}

#[derive(Default)]
struct WizardState {
    avatar: Option<AvatarAsset>,
    uploading: bool,
    upload_seq: u64,
    upload_error: Option<String>,
    selection: SelectionSet,
    result: ResultPane,
    enhance_error: Option<String>,
    in_flight: Option<InFlight>,
    next_action_id: u64,
}

impl WizardState {
    fn avatar_url(&self) -> Option<&str> {
        self.avatar.as_ref().and_then(|a| a.remote_url.as_deref())
    }

    fn is_busy(&self, kind: ActionKind) -> bool {
        self.in_flight.as_ref().map(|f| f.kind == kind).unwrap_or(false)
    }

    fn can_enhance(&self) -> bool {
        self.selection.is_complete() && self.in_flight.is_none()
    }

    fn can_generate(&self) -> bool {
        self.avatar_url().is_some() && !self.uploading && self.can_enhance()
    }

    fn cancel_in_flight(&mut self) -> bool {
        match self.in_flight.take() {
            Some(flight) => {
                flight.cancel.cancel();
                if flight.kind == ActionKind::Generate && self.result == ResultPane::Loading {
                    self.result = ResultPane::Placeholder;
                }
                true
            }
            None => false,
        }
    }

    fn begin(&mut self, kind: ActionKind) -> (u64, CancellationToken) {
        self.next_action_id += 1;
        let cancel = CancellationToken::new();
        self.in_flight = Some(InFlight {
            id: self.next_action_id,
            kind,
            cancel: cancel.clone(),
        });
        (self.next_action_id, cancel)
    }

    /// Clear the in-flight marker if it still belongs to `id`
    fn finish(&mut self, id: u64) -> bool {
        match &self.in_flight {
            Some(flight) if flight.id == id => {
                self.in_flight = None;
                true
            }
            _ => false,
        }
    }
}

/// One user's wizard
pub struct SceneWizard {
    state: Mutex<WizardState>,
    deps: WizardDeps,
    throttle: Option<DefaultDirectRateLimiter>,
}

impl SceneWizard {
    pub fn new(deps: WizardDeps) -> Self {
        let throttle = Quota::with_period(deps.min_action_interval)
            .map(|q| RateLimiter::direct(q.allow_burst(NonZeroU32::MIN)));

        Self {
            state: Mutex::new(WizardState::default()),
            deps,
            throttle,
        }
    }

    /// Read an avatar from disk and upload it
    pub async fn select_avatar_path(&self, path: impl AsRef<Path>) -> Result<String> {
        match ImageFile::read(path).await {
            Ok(file) => self.select_avatar(file).await,
            Err(err) => {
                self.state.lock().upload_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Replace the avatar and upload it. Any in-flight action is cancelled.
    pub async fn select_avatar(&self, file: ImageFile) -> Result<String> {
        if let Err(err) = file.ensure_not_empty() {
            self.state.lock().upload_error = Some(err.to_string());
            return Err(err);
        }

        let seq = {
            let mut state = self.state.lock();
            if state.cancel_in_flight() {
                debug!("Cancelled in-flight action for new avatar");
            }
            state.upload_seq += 1;
            state.uploading = true;
            state.upload_error = None;
            state.avatar = Some(AvatarAsset {
                file_name: file.file_name.clone(),
                mime_type: file.mime_type().to_string(),
                size: file.bytes.len(),
                remote_url: None,
            });
            state.upload_seq
        };

        let outcome = self.deps.uploader.upload(&file).await;

        let mut state = self.state.lock();
        if state.upload_seq != seq {
            debug!(file_name = %file.file_name, "Ignoring superseded upload");
            return outcome;
        }

        state.uploading = false;
        match &outcome {
            Ok(url) => {
                if let Some(avatar) = state.avatar.as_mut() {
                    avatar.remote_url = Some(url.clone());
                }
            }
            Err(err) => {
                warn!(file_name = %file.file_name, error = %err, "Avatar upload failed");
                state.upload_error = Some(err.to_string());
            }
        }
        outcome
    }

    pub fn set_choice(&self, field: Field, choice: Choice) -> Result<()> {
        self.state.lock().selection.set(field, choice)
    }

    pub fn set_scene_text(&self, text: impl Into<String>) {
        self.state.lock().selection.free_text_scene = text.into();
    }

    pub fn update_selection(&self, update: SelectionUpdate) -> Result<()> {
        self.state.lock().selection.apply(update)
    }

    pub fn selection(&self) -> SelectionSet {
        self.state.lock().selection.clone()
    }

    pub fn result(&self) -> ResultPane {
        self.state.lock().result.clone()
    }

    pub fn can_generate(&self) -> bool {
        self.state.lock().can_generate()
    }

    pub fn can_enhance(&self) -> bool {
        self.state.lock().can_enhance()
    }

    pub fn is_generating(&self) -> bool {
        self.state.lock().is_busy(ActionKind::Generate)
    }

    pub fn is_enhancing(&self) -> bool {
        self.state.lock().is_busy(ActionKind::Enhance)
    }

    /// Abort whatever request is in flight
    pub fn cancel(&self) -> bool {
        let cancelled = self.state.lock().cancel_in_flight();
        if cancelled {
            info!("Cancelled in-flight action");
        }
        cancelled
    }

    fn check_throttle(&self) -> Result<()> {
        match &self.throttle {
            Some(limiter) if limiter.check().is_err() => Err(AppError::ActionThrottled),
            _ => Ok(()),
        }
    }

    /// Validate and mark a generate action as started, leaving the pane in `Loading`
    pub fn begin_generate(&self) -> Result<PendingAction> {
        let mut state = self.state.lock();

        let avatar_url = state
            .avatar_url()
            .map(str::to_string)
            .ok_or_else(|| AppError::IncompleteSelection("upload an avatar first".to_string()))?;
        ensure_complete(&state.selection)?;
        if state.in_flight.is_some() || state.uploading {
            return Err(AppError::ActionInFlight);
        }
        self.check_throttle()?;

        let prompt = self.deps.composer.compose(&state.selection);
        let (id, cancel) = state.begin(ActionKind::Generate);
        state.result = ResultPane::Loading;

        Ok(PendingAction {
            id,
            cancel,
            kind: ActionKind::Generate,
            avatar_url,
            prompt,
            selection: state.selection.clone(),
        })
    }

    /// Validate and mark an enhance action as started
    pub fn begin_enhance(&self) -> Result<PendingAction> {
        let mut state = self.state.lock();

        ensure_complete(&state.selection)?;
        if state.in_flight.is_some() {
            return Err(AppError::ActionInFlight);
        }
        self.check_throttle()?;

        let (id, cancel) = state.begin(ActionKind::Enhance);
        state.enhance_error = None;

        Ok(PendingAction {
            id,
            cancel,
            kind: ActionKind::Enhance,
            avatar_url: state.avatar_url().map(str::to_string).unwrap_or_default(),
            prompt: state.selection.free_text_scene.clone(),
            selection: state.selection.clone(),
        })
    }

    /// Run a started action to completion and record its outcome
    pub async fn run(&self, action: PendingAction) -> Result<String> {
        let generator = &self.deps.generator;
        let outcome = match action.kind {
            ActionKind::Generate => {
                generator
                    .generate(&action.avatar_url, &action.prompt, &action.cancel)
                    .await
            }
            ActionKind::Enhance => {
                generator
                    .enhance_prompt(&action.selection, &action.prompt, &action.cancel)
                    .await
            }
        };

        let mut state = self.state.lock();
        if !state.finish(action.id) {
            debug!(action = action.id, "Dropping result of superseded action");
            return outcome;
        }

        match (action.kind, &outcome) {
            (ActionKind::Generate, Ok(uri)) => {
                info!(action = action.id, "Scene generated");
                state.result = ResultPane::Image(uri.clone());
            }
            (ActionKind::Generate, Err(AppError::Cancelled)) => {
                state.result = ResultPane::Placeholder;
            }
            (ActionKind::Generate, Err(err)) => {
                warn!(action = action.id, error = %err, "Scene generation failed");
                state.result = ResultPane::Error(err.to_string());
            }
            (ActionKind::Enhance, Ok(text)) => {
                state.selection.free_text_scene = text.clone();
            }
            (ActionKind::Enhance, Err(AppError::Cancelled)) => {}
            (ActionKind::Enhance, Err(err)) => {
                warn!(action = action.id, error = %err, "Prompt enhancement failed");
                state.enhance_error = Some(err.to_string());
            }
        }
        outcome
    }

    /// Generate a scene and wait for the outcome
    pub async fn generate(&self) -> Result<String> {
        let action = self.begin_generate()?;
        self.run(action).await
    }

    /// Enhance the free-text scene and wait for the outcome
    pub async fn enhance(&self) -> Result<String> {
        let action = self.begin_enhance()?;
        self.run(action).await
    }

    /// Render the whole view
    pub fn snapshot(&self) -> WizardSnapshot {
        let state = self.state.lock();
        let selection = &state.selection;

        WizardSnapshot {
            avatar: state.avatar.clone(),
            uploading: state.uploading,
            upload_error: state.upload_error.clone(),
            steps: vec![
                step_view(Field::Style, "Choose Your Style", selection),
                step_view(Field::Palette, "Choose Color Palette", selection),
                step_view(Field::ClothingFocus, "Choose Clothing Focus", selection),
            ],
            scene_text: selection.free_text_scene.clone(),
            missing: selection.missing_fields(),
            composed_prompt: self.deps.composer.compose(selection),
            can_generate: state.can_generate(),
            can_enhance: state.can_enhance(),
            generating: state.is_busy(ActionKind::Generate),
            enhancing: state.is_busy(ActionKind::Enhance),
            enhance_error: state.enhance_error.clone(),
            result: state.result.clone(),
        }
    }
}

fn ensure_complete(selection: &SelectionSet) -> Result<()> {
    let missing = selection.missing_fields();
    if missing.is_empty() {
        return Ok(());
    }

    let names: Vec<&str> = missing.iter().map(Field::as_str).collect();
    Err(AppError::IncompleteSelection(format!("choose {}", names.join(", "))))
}

/// A validated action waiting to be run
pub struct PendingAction {
    id: u64,
    cancel: CancellationToken,
    kind: ActionKind,
    avatar_url: String,
    prompt: String,
    selection: SelectionSet,
}

/// Serializable rendering of the wizard
#[derive(Debug, Clone, Serialize)]
pub struct WizardSnapshot {
    pub avatar: Option<AvatarAsset>,
    pub uploading: bool,
    pub upload_error: Option<String>,
    pub steps: Vec<StepView>,
    pub scene_text: String,
    pub missing: Vec<Field>,
    pub composed_prompt: String,
    pub can_generate: bool,
    pub can_enhance: bool,
    pub generating: bool,
    pub enhancing: bool,
    pub enhance_error: Option<String>,
    pub result: ResultPane,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub field: Field,
    pub title: &'static str,
    pub options: Vec<OptionView>,
    pub custom_text: Option<String>,
    pub complete: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionView {
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<&'static [&'static str]>,
    pub selected: bool,
}

fn step_view(field: Field, title: &'static str, selection: &SelectionSet) -> StepView {
    let choice = selection.choice(field);
    let selected = |label: &str| matches!(choice, Choice::Preset(l) if l == label);

    let options = match field {
        Field::Style => STYLES
            .iter()
            .copied()
            .map(|s| OptionView { label: s, colors: None, selected: selected(s) })
            .collect(),
        Field::Palette => PALETTES
            .iter()
            .map(|p| OptionView { label: p.name, colors: Some(p.colors), selected: selected(p.name) })
            .collect(),
        Field::ClothingFocus => CLOTHING_FOCUS
            .iter()
            .copied()
            .map(|s| OptionView { label: s, colors: None, selected: selected(s) })
            .collect(),
    };

    StepView {
        field,
        title,
        options,
        custom_text: match choice {
            Choice::Custom(text) => Some(text.clone()),
            _ => None,
        },
        complete: choice.is_set(),
    }
}
