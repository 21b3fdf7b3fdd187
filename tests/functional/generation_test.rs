//! Functional tests for the generation client against a stubbed vendor API

mod support;

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scene_studio::generation::SceneGenerator;
use scene_studio::media::ImageFile;
use scene_studio::prompt::{Choice, SelectionSet};
use scene_studio::storage::AssetUploader;
use scene_studio::AppError;
use support::*;

/// Bucket that answers 503 to the first `failures` fetches
struct FlakyBucket {
    failures: u32,
    fetches: AtomicU32,
}

#[async_trait]
impl AssetUploader for FlakyBucket {
    async fn upload(&self, _file: &ImageFile) -> scene_studio::Result<String> {
        Ok(AVATAR_URL.to_string())
    }

    async fn fetch(&self, _remote_url: &str) -> scene_studio::Result<ImageFile> {
        if self.fetches.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(AppError::UpstreamStatus {
                status: 503,
                body: "slow down".to_string(),
            });
        }
        Ok(ImageFile::new("avatar.png", PNG.to_vec()))
    }
}

/// Bucket whose fetch never completes
struct StalledBucket;

#[async_trait]
impl AssetUploader for StalledBucket {
    async fn upload(&self, _file: &ImageFile) -> scene_studio::Result<String> {
        Ok(AVATAR_URL.to_string())
    }

    async fn fetch(&self, _remote_url: &str) -> scene_studio::Result<ImageFile> {
        std::future::pending().await
    }
}

fn client(server: &MockServer) -> scene_studio::generation::GenerationClient {
    fast_client(&server.uri(), Arc::new(StubUploader::new()))
}

async fn request_bodies(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_generate_first_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .and(header("x-goog-api-key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("QUJD")))
        .expect(1)
        .mount(&server)
        .await;

    let uri = client(&server)
        .generate(AVATAR_URL, "a scene", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(uri, "data:image/png;base64,QUJD");
}

#[tokio::test]
async fn test_request_inlines_avatar_and_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("QUJD")))
        .mount(&server)
        .await;

    client(&server)
        .generate(AVATAR_URL, "put me on the moon", &CancellationToken::new())
        .await
        .unwrap();

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies.len(), 1);

    let parts = &bodies[0]["contents"][0]["parts"];
    assert_eq!(parts[0]["text"], "put me on the moon");
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
    assert_eq!(
        parts[1]["inlineData"]["data"],
        scene_studio::media::base64::encode(&PNG)
    );
    assert_eq!(bodies[0]["generationConfig"]["responseModalities"][0], "IMAGE");
}

#[tokio::test]
async fn test_response_mime_type_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{"content": {"parts": [
                {"text": "Here is your scene"},
                {"inline_data": {"mime_type": "image/jpeg", "data": "/9j/"}}
            ]}}]
        })))
        .mount(&server)
        .await;

    let uri = client(&server)
        .generate(AVATAR_URL, "p", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(uri, "data:image/jpeg;base64,/9j/");
}

#[tokio::test]
async fn test_recovers_after_two_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("QUJD")))
        .mount(&server)
        .await;

    let uri = client(&server)
        .generate(AVATAR_URL, "p", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(uri, "data:image/png;base64,QUJD");
    assert_eq!(request_bodies(&server).await.len(), 3);
}

#[tokio::test]
async fn test_always_500_exhausts_five_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .expect(5)
        .mount(&server)
        .await;

    let result = client(&server)
        .generate(AVATAR_URL, "p", &CancellationToken::new())
        .await;

    match result {
        Err(AppError::RetriesExhausted { attempts, last_error }) => {
            assert_eq!(attempts, 5);
            assert!(last_error.contains("500"));
        }
        other => panic!("expected exhausted retries, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_image_field_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("I cannot draw that")))
        .expect(5)
        .mount(&server)
        .await;

    let result = client(&server)
        .generate(AVATAR_URL, "p", &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(AppError::RetriesExhausted { .. })));
}

#[tokio::test]
async fn test_invalid_json_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(5)
        .mount(&server)
        .await;

    let result = client(&server)
        .generate(AVATAR_URL, "p", &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(AppError::RetriesExhausted { .. })));
}

#[tokio::test]
async fn test_avatar_fetch_failure_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("QUJD")))
        .expect(0)
        .mount(&server)
        .await;

    let client = fast_client(&server.uri(), Arc::new(FailingUploader));
    let result = client
        .generate(AVATAR_URL, "p", &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(AppError::Upload(_))));
}

#[tokio::test]
async fn test_enhance_prompt_returns_paragraph() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(enhance_path()))
        .and(header("x-goog-api-key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response(
            "  Standing on a rain-soaked neon bridge above the city.  ",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let selection = SelectionSet {
        style: Choice::preset("Cyberpunk Neon"),
        palette: Choice::preset("Midnight Glow"),
        clothing_focus: Choice::preset("Streetwear / Cozy"),
        free_text_scene: String::new(),
    };

    let text = client(&server)
        .enhance_prompt(&selection, "on a bridge", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(text, "Standing on a rain-soaked neon bridge above the city.");

    let bodies = request_bodies(&server).await;
    let user_text = bodies[0]["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(user_text.contains("Cyberpunk Neon"));
    assert!(user_text.contains("on a bridge"));
    assert!(bodies[0]["systemInstruction"]["parts"][0]["text"]
        .as_str()
        .unwrap()
        .contains("one vivid paragraph"));
    assert!(bodies[0].get("generationConfig").is_none());
}

#[tokio::test]
async fn test_enhance_retries_until_text_arrives() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(enhance_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(enhance_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("A quiet forest.")))
        .mount(&server)
        .await;

    let text = client(&server)
        .enhance_prompt(&SelectionSet::default(), "", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(text, "A quiet forest.");
    assert_eq!(request_bodies(&server).await.len(), 2);
}

#[tokio::test]
async fn test_transient_avatar_fetch_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("QUJD")))
        .expect(1)
        .mount(&server)
        .await;

    let bucket = Arc::new(FlakyBucket {
        failures: 2,
        fetches: AtomicU32::new(0),
    });
    let uri = fast_client(&server.uri(), bucket.clone())
        .generate(AVATAR_URL, "p", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(uri, "data:image/png;base64,QUJD");
    assert_eq!(bucket.fetches.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_cancel_interrupts_slow_avatar_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("QUJD")))
        .expect(0)
        .mount(&server)
        .await;

    let client = fast_client(&server.uri(), Arc::new(StalledBucket));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(5), client.generate(AVATAR_URL, "p", &cancel))
        .await
        .unwrap();
    assert!(matches!(result, Err(AppError::Cancelled)));
}
