use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::config::Config;
use crate::error::QuizError;
use crate::models::{Question, OPTIONS_PER_QUESTION, QUESTIONS_PER_QUIZ};

/// Notes beyond this many characters are not sent to the model.
pub const MAX_NOTES_CHARS: usize = 10_000;

const SYSTEM_INSTRUCTION: &str = "You are an expert educator. Create challenging but fair \
multiple-choice questions. Each question must have exactly 4 options. Provide a clear \
explanation for the correct answer.";

#[async_trait]
pub trait QuizGenerator: Send + Sync {
    /// Produces exactly [`QUESTIONS_PER_QUIZ`] questions for the notes. One
    /// request per call, never retried.
    async fn generate(&self, notes: &str, title: &str) -> Result<Vec<Question>, QuizError>;
}

/// First [`MAX_NOTES_CHARS`] characters of `text`, cut on a char boundary.
pub fn truncate_notes(text: &str) -> &str {
    match text.char_indices().nth(MAX_NOTES_CHARS) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "STRING" },
                "question": { "type": "STRING" },
                "options": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "Array of exactly 4 choices"
                },
                "correctAnswerIndex": {
                    "type": "INTEGER",
                    "description": "Zero-based index of the correct answer"
                },
                "explanation": { "type": "STRING" }
            },
            "required": ["id", "question", "options", "correctAnswerIndex", "explanation"]
        }
    })
}

/// Body of a `generateContent` call for the given notes.
pub fn build_request_body(notes: &str, title: &str) -> Value {
    let prompt = format!(
        "Generate a {}-question multiple choice mock test based on the following lecture notes \
         titled \"{}\".\nNotes: {}",
        QUESTIONS_PER_QUIZ,
        title,
        truncate_notes(notes)
    );

    json!({
        "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema()
        }
    })
}

/// Parses and validates the model's JSON text. Any deviation from the schema
/// rejects the whole response.
pub fn parse_questions(raw: &str) -> Result<Vec<Question>, QuizError> {
    let questions: Vec<Question> = serde_json::from_str(raw.trim())
        .map_err(|e| QuizError::MalformedResponse(format!("invalid question JSON: {}", e)))?;

    if questions.len() != QUESTIONS_PER_QUIZ {
        return Err(QuizError::MalformedResponse(format!(
            "expected {} questions, got {}",
            QUESTIONS_PER_QUIZ,
            questions.len()
        )));
    }

    if let Some(bad) = questions
        .iter()
        .find(|q| q.correct_answer_index >= OPTIONS_PER_QUESTION)
    {
        return Err(QuizError::MalformedResponse(format!(
            "question '{}' has answer index {}",
            bad.id, bad.correct_answer_index
        )));
    }

    Ok(questions)
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let text: String = self
            .candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Gemini `generateContent` REST client.
pub struct GeminiQuizGenerator {
    http_client: Client,
    endpoint: Url,
    api_key: String,
}

impl GeminiQuizGenerator {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let base = Url::parse(base_url)?;
        let endpoint = base.join(&format!("v1beta/models/{}:generateContent", model))?;
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            endpoint,
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            &config.gemini_base_url,
            &config.gemini_model,
            config.gemini_api_key.clone(),
            Duration::from_secs(config.generation_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl QuizGenerator for GeminiQuizGenerator {
    async fn generate(&self, notes: &str, title: &str) -> Result<Vec<Question>, QuizError> {
        if self.api_key.is_empty() {
            return Err(QuizError::GenerationFailure(
                "no API key configured".to_string(),
            ));
        }

        tracing::debug!(
            "Calling generation API: {} title={} notes_chars={}",
            self.endpoint,
            title,
            notes.chars().count()
        );

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request_body(notes, title))
            .send()
            .await
            .map_err(|e| QuizError::GenerationFailure(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(QuizError::GenerationFailure(format!(
                "service returned {}: {}",
                status, error_text
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            QuizError::GenerationFailure(format!("unreadable service response: {}", e))
        })?;

        let text = body
            .text()
            .ok_or_else(|| QuizError::GenerationFailure("empty response".to_string()))?;

        parse_questions(&text).inspect_err(|e| {
            tracing::error!("Generation response rejected: {} raw={}", e, text);
        })
    }
}
