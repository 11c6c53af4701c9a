// AI Provider Service
// Gemini REST client: single-shot generation (optionally with inline media),
// multi-turn chat and model listing

use crate::models::ChatTurn;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

pub const GEMINI_DEFAULT_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("API key not configured")]
    MissingApiKey,
}

/// Binary attachment sent inline with a prompt.
#[derive(Debug, Clone)]
pub struct MediaPart {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    pub content: String,
    pub latency_ms: i64,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }
}

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// `gemini-1.5-flash` and `models/gemini-1.5-flash` both address the same model.
pub fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

fn text_part(text: &str) -> Value {
    json!({ "text": text })
}

fn media_part(media: &MediaPart) -> Value {
    json!({
        "inlineData": {
            "mimeType": media.mime_type,
            "data": BASE64.encode(&media.data),
        }
    })
}

fn generation_body(contents: Vec<Value>, config: GenerationConfig) -> Value {
    json!({
        "contents": contents,
        "generationConfig": {
            "temperature": config.temperature,
            "maxOutputTokens": config.max_output_tokens,
        }
    })
}

/// Concatenate the text parts of the first candidate.
fn candidate_text(data: &Value) -> Option<String> {
    let parts = data["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)
    }

    /// One-shot generation: prompt plus optional inline media.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        media: Option<&MediaPart>,
        config: GenerationConfig,
    ) -> Result<ChatResult, ProviderError> {
        let mut parts = vec![text_part(prompt)];
        if let Some(media) = media {
            parts.push(media_part(media));
        }
        let contents = vec![json!({ "role": "user", "parts": parts })];
        self.call_generate_api(model, contents, config).await
    }

    /// Replay `history` and send `message` as the next user turn.
    pub async fn chat(
        &self,
        model: &str,
        history: &[ChatTurn],
        message: &str,
        config: GenerationConfig,
    ) -> Result<ChatResult, ProviderError> {
        let mut contents: Vec<Value> = history
            .iter()
            .map(|turn| {
                let parts: Vec<Value> = turn.parts.iter().map(|p| text_part(p)).collect();
                json!({ "role": turn.role, "parts": parts })
            })
            .collect();
        contents.push(json!({ "role": "user", "parts": [text_part(message)] }));
        self.call_generate_api(model, contents, config).await
    }

    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let api_key = self.api_key()?;
        let url = format!("{}/models?pageSize=1000", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: ListModelsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;
        Ok(data.models)
    }

    async fn call_generate_api(
        &self,
        model: &str,
        contents: Vec<Value>,
        config: GenerationConfig,
    ) -> Result<ChatResult, ProviderError> {
        let api_key = self.api_key()?;
        let path = model_path(model);
        let url = format!("{}/{}:generateContent", self.base_url, path);
        let request = generation_body(contents, config);

        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        // {"candidates":[{"content":{"parts":[{"text":"..."}]}}]}
        let data: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        let content = candidate_text(&data).ok_or(ProviderError::MissingContent)?;
        debug!(
            "[PROVIDER] {} answered {} chars in {}ms",
            path,
            content.len(),
            latency_ms
        );

        Ok(ChatResult {
            content,
            latency_ms,
            model: path,
        })
    }
}

/// Get API key from environment or config file
pub fn get_api_key(provider: &str) -> Option<String> {
    let env_keys = match provider {
        "gemini" => vec!["GEMINI_API_KEY", "AUTHENEX_GEMINI_API_KEY"],
        "newsdata" => vec!["NEWSDATA_API_KEY", "AUTHENEX_NEWSDATA_API_KEY"],
        _ => vec![],
    };

    for key in env_keys {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    let store = super::ConfigStore::from_env()?;
    match store.get_api_key(provider) {
        Ok(key) => key,
        Err(_) => None,
    }
}
