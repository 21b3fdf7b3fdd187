//! Request handlers for the wizard API

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::media::ImageFile;
use crate::prompt::options::{Palette, CLOTHING_FOCUS, PALETTES, STYLES};
use crate::prompt::SelectionUpdate;
use crate::view::{SceneWizard, WizardSnapshot};
use crate::AppState;

pub const FILE_NAME_HEADER: &str = "x-file-name";

#[derive(Serialize)]
pub struct Catalog {
    pub styles: &'static [&'static str],
    pub palettes: &'static [Palette],
    pub clothing_focus: &'static [&'static str],
}

#[derive(Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub view: WizardSnapshot,
}

/// GET /health - Liveness check
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /v1/catalog - Styles, palettes and clothing options
pub async fn catalog() -> Json<Catalog> {
    Json(Catalog {
        styles: STYLES,
        palettes: PALETTES,
        clothing_focus: CLOTHING_FOCUS,
    })
}

/// POST /v1/sessions - Anonymous sign-in, starts a fresh wizard
pub async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (session_id, wizard) = state.sessions.create();
    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id,
            created_at: Utc::now(),
            view: wizard.snapshot(),
        }),
    )
}

/// GET /v1/sessions/:id - Current view snapshot
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardSnapshot>> {
    Ok(Json(state.sessions.get(&id)?.snapshot()))
}

/// DELETE /v1/sessions/:id - Close the session, cancelling in-flight work
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.sessions.remove(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/sessions/:id/avatar - Raw image bytes in the body; original file name in `x-file-name`
pub async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WizardSnapshot>> {
    let wizard = state.sessions.get(&id)?;
    let file_name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("avatar");

    debug!(session = %id, file_name = %file_name, size = body.len(), "Avatar received");
    wizard
        .select_avatar(ImageFile::new(file_name, body.to_vec()))
        .await?;
    Ok(Json(wizard.snapshot()))
}

/// PUT /v1/sessions/:id/selection - Partial selection update
pub async fn update_selection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<SelectionUpdate>,
) -> Result<Json<WizardSnapshot>> {
    let wizard = state.sessions.get(&id)?;
    wizard.update_selection(update)?;
    Ok(Json(wizard.snapshot()))
}

/// POST /v1/sessions/:id/generate - Start generation, poll the session for the result
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let wizard = state.sessions.get(&id)?;
    let action = wizard.begin_generate()?;
    spawn_action(wizard.clone(), action);
    Ok((StatusCode::ACCEPTED, Json(wizard.snapshot())))
}

/// POST /v1/sessions/:id/enhance - Start prompt enhancement
pub async fn enhance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let wizard = state.sessions.get(&id)?;
    let action = wizard.begin_enhance()?;
    spawn_action(wizard.clone(), action);
    Ok((StatusCode::ACCEPTED, Json(wizard.snapshot())))
}

/// POST /v1/sessions/:id/cancel - Abort the in-flight action
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardSnapshot>> {
    let wizard = state.sessions.get(&id)?;
    wizard.cancel();
    Ok(Json(wizard.snapshot()))
}

fn spawn_action(wizard: Arc<SceneWizard>, action: crate::view::PendingAction) {
    // outcome is recorded in the wizard's state; clients poll the session
    tokio::spawn(async move {
        let _ = wizard.run(action).await;
    });
}
