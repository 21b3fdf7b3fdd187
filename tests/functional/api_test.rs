//! Functional tests for the session API

mod support;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use scene_studio::api::create_router;
use scene_studio::config::Settings;
use scene_studio::generation::SceneGenerator;
use scene_studio::AppState;
use support::*;

fn app_with(generator: Arc<dyn SceneGenerator>) -> Router {
    let mut settings = Settings::default();
    settings.rate_limit.enabled = false;
    settings.view.min_action_interval_ms = 0;

    let state = AppState::with_deps(settings, Arc::new(StubUploader::new()), generator);
    create_router(Arc::new(state))
}

fn app() -> Router {
    app_with(Arc::new(InstantGenerator::default()))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap()
}

fn put_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn new_session(app: &Router) -> String {
    let (status, body) = send(app, post("/v1/sessions")).await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_id"].as_str().unwrap().to_string()
}

async fn upload_avatar(app: &Router, session: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/v1/sessions/{}/avatar", session))
        .header("x-file-name", "avatar.png")
        .header("content-type", "image/png")
        .body(Body::from(PNG.to_vec()))
        .unwrap();
    send(app, request).await
}

async fn choose_all(app: &Router, session: &str) -> (StatusCode, Value) {
    send(
        app,
        put_json(
            &format!("/v1/sessions/{}/selection", session),
            json!({
                "style": {"kind": "preset", "value": "Cyberpunk Neon"},
                "palette": {"kind": "preset", "value": "Ocean Mist"},
                "clothing_focus": {"kind": "preset", "value": "Full Dress or Gown"}
            }),
        ),
    )
    .await
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_catalog_lists_options() {
    let (status, body) = send(&app(), get("/v1/catalog")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["styles"].as_array().unwrap().contains(&json!("Kawaii")));
    assert_eq!(body["palettes"][0]["name"], "Ocean Mist");
    assert_eq!(body["palettes"][0]["colors"][0], "#A1C4FD");
    assert!(body["clothing_focus"].as_array().unwrap().len() >= 6);
}

#[tokio::test]
async fn test_new_session_starts_empty() {
    let app = app();
    let (status, body) = send(&app, post("/v1/sessions")).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["view"]["result"]["state"], "placeholder");
    assert_eq!(body["view"]["can_generate"], false);
    assert_eq!(body["view"]["can_enhance"], false);
    assert_eq!(body["view"]["missing"], json!(["style", "palette", "clothing_focus"]));
}

#[tokio::test]
async fn test_unknown_session_is_404() {
    let (status, body) = send(&app(), get(&format!("/v1/sessions/{}", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "session_not_found");
}

#[tokio::test]
async fn test_generate_before_selection_conflicts() {
    let app = app();
    let session = new_session(&app).await;

    let (status, body) = send(&app, post(&format!("/v1/sessions/{}/generate", session))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "incomplete_selection");
}

#[tokio::test]
async fn test_unknown_preset_is_rejected() {
    let app = app();
    let session = new_session(&app).await;

    let (status, _) = send(
        &app,
        put_json(
            &format!("/v1/sessions/{}/selection", session),
            json!({"style": {"kind": "preset", "value": "Vaporwave"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_full_flow_produces_image() {
    let app = app();
    let session = new_session(&app).await;

    let (status, body) = upload_avatar(&app, &session).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["avatar"]["remote_url"], AVATAR_URL);
    assert_eq!(body["avatar"]["mime_type"], "image/png");

    let (status, body) = choose_all(&app, &session).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_generate"], true);

    let (status, _) = send(&app, post(&format!("/v1/sessions/{}/generate", session))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let mut view = Value::Null;
    for _ in 0..100 {
        let (_, body) = send(&app, get(&format!("/v1/sessions/{}", session))).await;
        if body["result"]["state"] == "image" {
            view = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(view["result"]["value"], "data:image/png;base64,QUJD");
    assert_eq!(view["generating"], false);
}

#[tokio::test]
async fn test_enhance_then_cancel_generation() {
    let app = app_with(Arc::new(HangingGenerator));
    let session = new_session(&app).await;
    upload_avatar(&app, &session).await;
    choose_all(&app, &session).await;

    let (status, body) = send(&app, post(&format!("/v1/sessions/{}/generate", session))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["result"]["state"], "loading");
    assert_eq!(body["generating"], true);

    let (status, _) = send(&app, post(&format!("/v1/sessions/{}/enhance", session))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, post(&format!("/v1/sessions/{}/cancel", session))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["state"], "placeholder");
    assert_eq!(body["generating"], false);
}

#[tokio::test]
async fn test_delete_session() {
    let app = app();
    let session = new_session(&app).await;

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/v1/sessions/{}", session))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get(&format!("/v1/sessions/{}", session))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_avatar_rejected() {
    let mut settings = Settings::default();
    settings.rate_limit.enabled = false;
    settings.storage.max_avatar_bytes = 16;
    let state = AppState::with_deps(
        settings,
        Arc::new(StubUploader::new()),
        Arc::new(InstantGenerator::default()),
    );
    let app = create_router(Arc::new(state));
    let session = new_session(&app).await;

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/v1/sessions/{}/avatar", session))
        .body(Body::from(vec![0u8; 64]))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_expired_session_is_gone() {
    let mut settings = Settings::default();
    settings.rate_limit.enabled = false;
    settings.view.session_ttl_secs = 0;
    let state = Arc::new(AppState::with_deps(
        settings,
        Arc::new(StubUploader::new()),
        Arc::new(InstantGenerator::default()),
    ));
    let app = create_router(state.clone());
    let session = new_session(&app).await;

    assert_eq!(state.sessions.evict_idle(), 1);

    let (status, body) = send(&app, get(&format!("/v1/sessions/{}", session))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "session_not_found");
}
