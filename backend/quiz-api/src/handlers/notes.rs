use axum::{extract::State, response::IntoResponse, Json};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::AppError, extractors::AppJson, models::notes::UploadNotesRequest, services::AppState,
};

/// POST /api/v1/notes
pub async fn upload_notes(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<UploadNotesRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let pdf = general_purpose::STANDARD
        .decode(req.pdf_base64.trim())
        .map_err(|e| AppError::BadRequest(format!("pdf_base64 is not valid base64: {}", e)))?;

    tracing::info!("Received notes upload: file={} bytes={}", req.file_name, pdf.len());

    let view = state.study.submit_notes(&req.file_name, pdf).await?;
    Ok(Json(view))
}
