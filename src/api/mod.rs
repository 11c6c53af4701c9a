// Authenex HTTP API
// Axum router over the analysis pipeline, chat assistant and news feed

pub mod analyze;
pub mod chat;
pub mod error;
pub mod news;

pub use error::{ApiError, ErrorResponse};

use crate::models::HealthResponse;
use crate::services::chat::{ChatService, ModelSelector};
use crate::services::detection::Analyzer;
use crate::services::news::{NewsCache, NewsService};
use crate::services::providers::{get_api_key, GeminiClient};
use crate::services::AppConfig;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::HeaderValue;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub const SERVICE_NAME: &str = "Authenex Backend";

/// Shared by every handler.
pub struct AppState {
    pub config: AppConfig,
    pub analyzer: Analyzer,
    pub chat: ChatService,
    pub news: NewsService,
}

impl AppState {
    /// Build services with explicit API keys.
    pub fn with_keys(config: AppConfig, gemini_key: Option<String>, newsdata_key: Option<String>) -> Self {
        let model = &config.model;
        let client = GeminiClient::new(&model.api_url, gemini_key, model.request_timeout());

        let analyzer = Analyzer::new(client.clone(), model.analysis_model.clone(), model.generation());
        let selector = ModelSelector::new(
            model.chat_priorities.clone(),
            model.chat_fallback_model.clone(),
            model.selection_refresh(),
        );
        let chat = ChatService::new(client, selector, model.generation());
        let news = NewsService::new(
            &config.news.api_url,
            newsdata_key,
            NewsCache::new(
                config.news.cache_file.clone(),
                Duration::from_secs(config.news.cache_ttl_secs),
            ),
        );

        Self {
            config,
            analyzer,
            chat,
            news,
        }
    }

    /// Build services with keys resolved from the environment or config file.
    pub fn from_config(config: AppConfig) -> Self {
        let gemini_key = get_api_key("gemini");
        if gemini_key.is_none() {
            warn!("[API] GEMINI_API_KEY not set; analyses will degrade and chat will fail");
        }
        let newsdata_key = get_api_key("newsdata");
        if newsdata_key.is_none() {
            info!("[API] NEWSDATA_API_KEY not set; news feed serves built-in articles");
        }
        Self::with_keys(config, gemini_key, newsdata_key)
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("[API] Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(values))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/", get(health))
        .route("/analyze", post(analyze::analyze_image))
        .route("/analyze-audio", post(analyze::analyze_audio))
        .route("/analyze-video", post(analyze::analyze_video))
        .route("/analyze-document", post(analyze::analyze_document))
        .route("/analyze-text", post(analyze::analyze_text))
        .route("/analyze-email", post(analyze::analyze_email))
        .route("/api/chat", post(chat::chat))
        .route("/api/news", get(news::get_news))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        service: SERVICE_NAME.to_string(),
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        gemini_configured: state.analyzer.is_configured(),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// State with no API keys and a private cache path, so nothing touches the network.
    pub fn offline_state(dir: &std::path::Path) -> Arc<AppState> {
        let mut config = AppConfig::default();
        config.news.cache_file = dir.join("news_cache.json");
        Arc::new(AppState::with_keys(config, None, None))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::offline_state;
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(offline_state(dir.path()));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["service"], SERVICE_NAME);
        assert_eq!(body["status"], "running");
        assert_eq!(body["gemini_configured"], false);
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(offline_state(dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/analyze-text")
                    .header("origin", "http://localhost:3000")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(offline_state(dir.path()));
        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
