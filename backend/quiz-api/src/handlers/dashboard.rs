use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::services::AppState;

/// GET /api/v1/dashboard
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.study.dashboard().await)
}

/// GET /api/v1/history
pub async fn get_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.study.history().await)
}
