use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{quiz_session::SessionError, screen::ScreenError};

/// Failures of the notes-to-quiz flow. Each one aborts the current upload and
/// leaves the user on the upload screen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("could not extract text from the PDF: {0}")]
    ExtractionFailure(String),
    #[error("quiz generation failed: {0}")]
    GenerationFailure(String),
    #[error("malformed AI response: {0}")]
    MalformedResponse(String),
}

impl QuizError {
    pub fn kind(&self) -> &'static str {
        match self {
            QuizError::ExtractionFailure(_) => "extraction_failure",
            QuizError::GenerationFailure(_) => "generation_failure",
            QuizError::MalformedResponse(_) => "malformed_response",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Screen(#[from] ScreenError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Quiz(QuizError::GenerationFailure(_)) => {
                (StatusCode::BAD_GATEWAY, "generation_failure")
            }
            AppError::Quiz(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.kind()),
            AppError::Screen(ScreenError::GenerationInProgress) => {
                (StatusCode::CONFLICT, "generation_in_progress")
            }
            AppError::Screen(ScreenError::StaleGeneration) => {
                (StatusCode::CONFLICT, "stale_generation")
            }
            AppError::Screen(ScreenError::Session(e)) | AppError::Session(e) => match e {
                SessionError::OptionOutOfRange(_) => (StatusCode::BAD_REQUEST, "invalid_option"),
                _ => (StatusCode::CONFLICT, "invalid_session_action"),
            },
            AppError::Screen(_) => (StatusCode::CONFLICT, "invalid_screen"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::error!("Request failed: {:#}", self);
        } else {
            tracing::warn!("Request rejected ({}): {}", kind, self);
        }

        let body = json!({
            "message": self.to_string(),
            "kind": kind,
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}
