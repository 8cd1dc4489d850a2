#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;
use tower::ServiceExt;

use quiz_api::{
    config::{Config, StorageBackend},
    create_router,
    error::QuizError,
    models::Question,
    services::{
        history_slot::MemorySlot,
        notes_extractor::TextExtractor,
        quiz_generator::QuizGenerator,
        result_store::{HistoryStore, ResultStore},
        AppState,
    },
};

pub const NOTES: &str =
    "The citric acid cycle oxidises acetyl-CoA to carbon dioxide and yields NADH and FADH2.";

/// Correct option for each generated question.
pub const ANSWER_KEY: [usize; 5] = [0, 1, 2, 3, 0];

pub struct FakeExtractor(pub Result<String, QuizError>);

impl TextExtractor for FakeExtractor {
    fn extract_text(&self, _pdf: &[u8]) -> Result<String, QuizError> {
        self.0.clone()
    }
}

pub struct FakeGenerator(pub Result<Vec<Question>, QuizError>);

#[async_trait]
impl QuizGenerator for FakeGenerator {
    async fn generate(&self, _notes: &str, _title: &str) -> Result<Vec<Question>, QuizError> {
        self.0.clone()
    }
}

pub fn questions() -> Vec<Question> {
    ANSWER_KEY
        .iter()
        .enumerate()
        .map(|(i, correct)| Question {
            id: format!("q{}", i + 1),
            question: format!("Question {}", i + 1),
            options: [
                "A".to_string(),
                "B".to_string(),
                "C".to_string(),
                "D".to_string(),
            ],
            correct_answer_index: *correct,
            explanation: format!("Option {} is right", correct),
        })
        .collect()
}

pub fn test_config() -> Config {
    Config {
        storage_backend: StorageBackend::Memory,
        // Countdown ticks never fire during a test.
        tick_interval_ms: 3_600_000,
        ..Config::default()
    }
}

pub struct TestApp {
    pub config: Config,
    pub slot: MemorySlot,
    pub extractor: Result<String, QuizError>,
    pub generator: Result<Vec<Question>, QuizError>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self {
            config: test_config(),
            slot: MemorySlot::new(),
            extractor: Ok(NOTES.to_string()),
            generator: Ok(questions()),
        }
    }
}

impl TestApp {
    pub fn build(self) -> Router {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();

        let store: Arc<dyn HistoryStore> = Arc::new(ResultStore::new(
            Arc::new(self.slot),
            self.config.history_key.clone(),
            self.config.history_capacity,
        ));
        let state = AppState::with_components(
            self.config,
            store,
            Arc::new(FakeGenerator(self.generator)),
            Arc::new(FakeExtractor(self.extractor)),
        );
        create_router(Arc::new(state))
    }
}

pub fn create_test_app() -> Router {
    TestApp::default().build()
}

pub fn pdf_base64() -> String {
    general_purpose::STANDARD.encode(b"%PDF-1.4 fake")
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub async fn upload_notes(app: &Router, file_name: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/v1/notes",
        Some(serde_json::json!({
            "file_name": file_name,
            "pdf_base64": pdf_base64(),
        })),
    )
    .await
}
