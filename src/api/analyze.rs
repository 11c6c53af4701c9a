// Analysis endpoints
// Multipart uploads for media and documents, JSON bodies for text and email

use super::error::ApiError;
use super::AppState;
use crate::models::{AnalyzeResponse, ContentKind, TextPayload};
use crate::services::detection::{build_response, Upload};
use crate::services::text_processor::normalize_text;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::response::Json;
use std::sync::Arc;
use tracing::info;

const UPLOAD_FIELD: &str = "file";

/// Pull the `file` field out of a multipart form.
async fn read_upload(multipart: Result<Multipart, MultipartRejection>) -> Result<Upload, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
        }
        return Ok(Upload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::BadRequest(format!(
        "missing multipart field `{}`",
        UPLOAD_FIELD
    )))
}

async fn analyze_upload(
    state: &AppState,
    kind: ContentKind,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let upload = read_upload(multipart).await?;
    info!(
        "[API] {} upload: {} ({} bytes)",
        kind,
        upload.file_name.as_deref().unwrap_or("unnamed"),
        upload.bytes.len()
    );

    let analysis = state.analyzer.analyze_upload(kind, upload).await;
    Ok(Json(build_response(analysis)?))
}

async fn analyze_body(
    state: &AppState,
    kind: ContentKind,
    payload: Result<Json<TextPayload>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if normalize_text(&payload.content).is_empty() {
        return Err(ApiError::BadRequest(format!("{} content must not be empty", kind)));
    }
    info!("[API] {} body: {} chars", kind, payload.content.chars().count());

    let analysis = state.analyzer.analyze_text_as(kind, &payload.content).await;
    Ok(Json(build_response(analysis)?))
}

pub async fn analyze_image(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    analyze_upload(&state, ContentKind::Image, multipart).await
}

pub async fn analyze_audio(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    analyze_upload(&state, ContentKind::Audio, multipart).await
}

pub async fn analyze_video(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    analyze_upload(&state, ContentKind::Video, multipart).await
}

pub async fn analyze_document(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    analyze_upload(&state, ContentKind::Document, multipart).await
}

pub async fn analyze_text(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TextPayload>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    analyze_body(&state, ContentKind::Text, payload).await
}

pub async fn analyze_email(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TextPayload>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    analyze_body(&state, ContentKind::Email, payload).await
}
