// Chat endpoint

use super::error::ApiError;
use super::AppState;
use crate::models::ChatRequest;
use crate::services::chat::error_envelope;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use std::sync::Arc;

/// Model failures answer 502 with the `{response, error}` envelope the widget renders.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    match state.chat.respond(&request).await {
        Ok(reply) => Ok(Json(reply).into_response()),
        Err(e) => Ok((StatusCode::BAD_GATEWAY, Json(error_envelope(&e))).into_response()),
    }
}
