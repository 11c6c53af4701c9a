// News endpoint

use super::error::ApiError;
use super::AppState;
use crate::models::{NewsQuery, NewsResponse};
use crate::services::news::NewsCategory;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Json;
use std::sync::Arc;

pub async fn get_news(
    State(state): State<Arc<AppState>>,
    query: Result<Query<NewsQuery>, QueryRejection>,
) -> Result<Json<NewsResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let category = NewsCategory::parse(query.category.as_deref());
    let limit = query.limit.unwrap_or(state.config.news.default_limit);

    let news = state.news.get_news(category, limit).await;
    Ok(Json(NewsResponse {
        success: true,
        category: category.as_str().to_string(),
        count: news.len(),
        news,
    }))
}
