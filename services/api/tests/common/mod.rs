#![allow(dead_code)]

use api_lib::{adapters::db::DbAdapter, config::Config, web};
use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use study_assistant_core::{
    prompts, testing::FakeAssistant, AssistantManager, AssistantSettings, DocumentSession,
    StudyOrchestrator, UploadCoordinator, UploadSettings,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub fake: Arc<FakeAssistant>,
    pub config: Arc<Config>,
    // Held so the upload directory outlives the test.
    _dir: TempDir,
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Files currently sitting in the upload directory.
    pub fn stored_files(&self) -> Vec<String> {
        match std::fs::read_dir(&self.config.upload_dir) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

pub async fn test_app() -> TestApp {
    test_app_with(|_| {}).await
}

pub async fn test_app_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();

    let mut config = Config::from_lookup(|key| match key {
        "PINECONE_API_KEY" => Some("test-key".to_string()),
        _ => None,
    })
    .unwrap();
    config.upload_dir = dir.path().join("uploads");
    customize(&mut config);
    let config = Arc::new(config);

    let fake = Arc::new(FakeAssistant::new());
    let assistant = Arc::new(AssistantManager::new(
        fake.clone(),
        AssistantSettings {
            name: config.assistant_name.clone(),
            instructions: prompts::ASSISTANT_INSTRUCTIONS.to_string(),
            ready_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(5),
        },
    ));
    let uploads = Arc::new(UploadCoordinator::new(
        assistant.clone(),
        UploadSettings {
            upload_dir: config.upload_dir.clone(),
            ingest_timeout: Some(Duration::from_secs(5)),
        },
        CancellationToken::new(),
    ));
    let study = Arc::new(StudyOrchestrator::new(
        assistant,
        uploads,
        Arc::new(DocumentSession::new()),
    ));

    let db = DbAdapter::in_memory().await.unwrap();
    let state = Arc::new(web::state::AppState {
        db: Arc::new(db),
        config: config.clone(),
        study,
    });

    TestApp {
        router: web::router(state),
        fake,
        config,
        _dir: dir,
    }
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(resp: Response<Body>) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A `multipart/form-data` request carrying one part named `file`.
pub fn upload_request(filename: &str, contents: &[u8]) -> Request<Body> {
    let boundary = "study-assistant-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload_pdf")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Registers a user and returns the issued bearer token.
pub async fn register(app: &TestApp, email: &str, password: &str, name: &str) -> String {
    let resp = app
        .send(post_json(
            "/auth/register",
            serde_json::json!({ "email": email, "password": password, "name": name }),
        ))
        .await;
    assert_eq!(resp.status(), 201);
    body_json(resp).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}
