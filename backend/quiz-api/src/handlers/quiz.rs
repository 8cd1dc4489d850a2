use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::AppError,
    extractors::AppJson,
    models::notes::{NavigateRequest, SelectAnswerRequest},
    services::AppState,
};

/// GET /api/v1/state
pub async fn get_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.study.state().await)
}

/// POST /api/v1/quiz/answer
pub async fn select_answer(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SelectAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    tracing::debug!("Answer selected: option={}", req.option_index);
    Ok(Json(state.study.select(req.option_index).await?))
}

/// POST /api/v1/quiz/advance
pub async fn advance(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.study.advance().await?))
}

/// POST /api/v1/quiz/restart
pub async fn restart(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    tracing::info!("Restarting quiz");
    Ok(Json(state.study.restart().await?))
}

/// POST /api/v1/navigate
pub async fn navigate(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<NavigateRequest>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!("Navigating to {:?}", req.target);
    Ok(Json(state.study.navigate(req.target).await?))
}
