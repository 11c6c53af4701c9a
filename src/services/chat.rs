// Chat Assistant Service
// Forensic assistant persona on top of the Gemini chat endpoint, with
// capability-based model selection cached for a configurable TTL

use crate::models::{
    ChatErrorEnvelope, ChatMode, ChatReply, ChatRequest, ChatTurn, HistoryPart, IncomingTurn,
};
use crate::services::providers::{GeminiClient, GenerationConfig, ModelInfo, ProviderError};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const SYSTEM_PROMPT: &str = r#"You are AUTHENEX AI, a forensic intelligence assistant embedded in a media authenticity product.

SCOPE:
- Deepfake detection, AI-generated content identification, media authenticity analysis and trust/risk explanation.
- You are not a general-purpose assistant; steer unrelated requests back to these topics.

BEHAVIOR:
1. Probabilistic language only. Never state certainty such as "this IS a deepfake"; prefer "indicators suggest" or "high likelihood of manipulation".
2. Calm, professional tone suitable for legal and enterprise settings. No slang or emojis.
3. Short, precise answers with bullet points for analysis. Expand only when asked for details, reasons or methods.
4. Safety:
   - Never accuse specific individuals of crimes.
   - Never give legal advice or claim court-admissible proof.
   - Refuse requests for help committing fraud or producing deepfakes and point to ethical use.

ANALYSIS FRAMEWORKS:
- Images: GAN noise, texture uniformity, lighting coherence, edge inconsistencies, facial symmetry artifacts. Report verdict (Human/AI/Uncertain), confidence %, top 3 indicators and risk level (Low/Med/High).
- Audio: spectral consistency, phase alignment, breath realism, compression mismatch. Report authenticity likelihood, confidence % and the primary anomaly.
- Text: perplexity variance, repetition entropy, semantic drift. Report a likelihood band such as "High likelihood of AI assistance" or "Inconclusive".

VOICE MODE:
- Very short sentences, spoken-friendly wording, no tables or heavy markdown.

Every forensic answer must include: "This analysis provides a probabilistic assessment and is not legal proof.""#;

pub const VOICE_SUFFIX: &str =
    "\n\n[INSTRUCTION]: Respond for VOICE OUTPUT. Be brief, spoken-friendly, no complex formatting.";

const VISION_MARKER: &str = "vision";

/// Keep turns that have a role and at least one text part.
pub fn flatten_history(turns: &[IncomingTurn]) -> Vec<ChatTurn> {
    turns
        .iter()
        .filter_map(|turn| {
            let role = turn.role.as_deref().map(str::trim).filter(|r| !r.is_empty())?;
            let parts: Vec<String> = turn
                .parts
                .iter()
                .filter_map(|part| match part {
                    HistoryPart::Plain(text) | HistoryPart::Labeled { text } => Some(text.clone()),
                    HistoryPart::Other(_) => None,
                })
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(ChatTurn {
                    role: role.to_string(),
                    parts,
                })
            }
        })
        .collect()
}

pub fn build_chat_prompt(message: &str, mode: ChatMode) -> String {
    let mut prompt = format!("{}\n\n[USER INPUT]: {}", SYSTEM_PROMPT, message);
    if mode == ChatMode::Voice {
        prompt.push_str(VOICE_SUFFIX);
    }
    prompt
}

/// Pick a chat model by priority substring, skipping vision-only models.
pub fn select_model(available: &[ModelInfo], priorities: &[String], fallback: &str) -> String {
    let candidates: Vec<&ModelInfo> = available
        .iter()
        .filter(|m| m.supports_generate_content() && !m.name.contains(VISION_MARKER))
        .collect();

    for priority in priorities {
        if let Some(model) = candidates.iter().find(|m| m.name.contains(priority.as_str())) {
            return model.name.clone();
        }
    }

    candidates
        .first()
        .map(|m| m.name.clone())
        .unwrap_or_else(|| fallback.to_string())
}

#[derive(Debug, Clone)]
struct CachedSelection {
    model: String,
    selected_at: Instant,
}

/// Owns the current chat model choice and refreshes it lazily.
pub struct ModelSelector {
    priorities: Vec<String>,
    fallback: String,
    ttl: Duration,
    cached: RwLock<Option<CachedSelection>>,
}

impl ModelSelector {
    pub fn new(priorities: Vec<String>, fallback: impl Into<String>, ttl: Duration) -> Self {
        Self {
            priorities,
            fallback: fallback.into(),
            ttl,
            cached: RwLock::new(None),
        }
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    async fn fresh(&self) -> Option<String> {
        let cached = self.cached.read().await;
        cached
            .as_ref()
            .filter(|c| c.selected_at.elapsed() < self.ttl)
            .map(|c| c.model.clone())
    }

    /// Cached model, or a new selection when stale. Listing failures fall back
    /// to the configured model without caching it.
    pub async fn current(&self, client: &GeminiClient) -> String {
        if let Some(model) = self.fresh().await {
            return model;
        }

        match client.list_models().await {
            Ok(models) => {
                let model = select_model(&models, &self.priorities, &self.fallback);
                info!("[CHAT] Selected model {} from {} listed", model, models.len());
                *self.cached.write().await = Some(CachedSelection {
                    model: model.clone(),
                    selected_at: Instant::now(),
                });
                model
            }
            Err(e) => {
                warn!("[CHAT] Model listing failed ({}), using {}", e, self.fallback);
                self.fallback.clone()
            }
        }
    }

    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}

pub struct ChatService {
    client: GeminiClient,
    selector: ModelSelector,
    generation: GenerationConfig,
}

impl ChatService {
    pub fn new(client: GeminiClient, selector: ModelSelector, generation: GenerationConfig) -> Self {
        Self {
            client,
            selector,
            generation,
        }
    }

    pub fn selector(&self) -> &ModelSelector {
        &self.selector
    }

    pub async fn respond(&self, request: &ChatRequest) -> Result<ChatReply, ProviderError> {
        if !self.client.is_configured() {
            return Err(ProviderError::MissingApiKey);
        }

        let history = flatten_history(&request.history);
        let prompt = build_chat_prompt(&request.message, request.mode);
        let model = self.selector.current(&self.client).await;
        debug!(
            "[CHAT] {} turns of history, mode {:?}, model {}",
            history.len(),
            request.mode,
            model
        );

        match self.client.chat(&model, &history, &prompt, self.generation).await {
            Ok(result) => {
                info!("[CHAT] Reply from {} in {}ms", result.model, result.latency_ms);
                Ok(ChatReply {
                    response: result.content,
                    confidence: 0.0,
                    risk_level: "N/A".to_string(),
                })
            }
            Err(e) => {
                warn!("[CHAT] {} failed: {}", model, e);
                self.selector.invalidate().await;
                Err(e)
            }
        }
    }
}

pub fn error_envelope(err: &ProviderError) -> ChatErrorEnvelope {
    ChatErrorEnvelope {
        response: format!("System Error: {}", err),
        error: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::GEMINI_DEFAULT_URL;

    fn model(name: &str, methods: &[&str]) -> ModelInfo {
        ModelInfo {
            name: name.to_string(),
            supported_generation_methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn priorities() -> Vec<String> {
        ["flash", "gemini-1.5-pro", "gemini-1.0-pro", "gemini-pro"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn turns(json: &str) -> Vec<IncomingTurn> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_flatten_labeled_parts() {
        let history = turns(r#"[{"role": "user", "parts": [{"text": "hi"}]}]"#);
        assert_eq!(
            flatten_history(&history),
            vec![ChatTurn { role: "user".to_string(), parts: vec!["hi".to_string()] }]
        );
    }

    #[test]
    fn test_flatten_drops_turns_without_text() {
        let history = turns(r#"[{"role": "model", "parts": []}]"#);
        assert!(flatten_history(&history).is_empty());

        let history = turns(r#"[{"parts": ["orphan"]}, {"role": "", "parts": ["x"]}]"#);
        assert!(flatten_history(&history).is_empty());
    }

    #[test]
    fn test_flatten_mixed_parts() {
        let history = turns(
            r#"[{"role": "model", "parts": ["plain", {"text": "labeled"}, {"image": "x"}, 42]}]"#,
        );
        let flat = flatten_history(&history);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].parts, vec!["plain", "labeled"]);
    }

    #[test]
    fn test_chat_prompt_modes() {
        let text = build_chat_prompt("Is this a deepfake?", ChatMode::Text);
        assert!(text.starts_with(SYSTEM_PROMPT));
        assert!(text.ends_with("[USER INPUT]: Is this a deepfake?"));

        let voice = build_chat_prompt("Is this a deepfake?", ChatMode::Voice);
        assert!(voice.ends_with(VOICE_SUFFIX));
    }

    #[test]
    fn test_select_model_priority_order() {
        let available = vec![
            model("models/gemini-1.0-pro", &["generateContent"]),
            model("models/gemini-1.5-flash", &["generateContent"]),
            model("models/embedding-001", &["embedContent"]),
        ];
        assert_eq!(select_model(&available, &priorities(), "gemini-pro"), "models/gemini-1.5-flash");
    }

    #[test]
    fn test_select_model_skips_vision() {
        let available = vec![
            model("models/gemini-pro-vision", &["generateContent"]),
            model("models/gemini-pro", &["generateContent"]),
        ];
        assert_eq!(select_model(&available, &priorities(), "fallback"), "models/gemini-pro");
    }

    #[test]
    fn test_select_model_first_then_fallback() {
        let available = vec![model("models/other-chat", &["generateContent"])];
        assert_eq!(select_model(&available, &priorities(), "gemini-pro"), "models/other-chat");

        let none = vec![model("models/embedding-001", &["embedContent"])];
        assert_eq!(select_model(&none, &priorities(), "gemini-pro"), "gemini-pro");
        assert_eq!(select_model(&[], &priorities(), "gemini-pro"), "gemini-pro");
    }

    #[test]
    fn test_error_envelope() {
        let envelope = error_envelope(&ProviderError::MissingApiKey);
        assert_eq!(envelope.response, "System Error: API key not configured");
        assert_eq!(envelope.error, "API key not configured");
    }

    #[tokio::test]
    async fn test_selector_falls_back_when_listing_fails() {
        let client = GeminiClient::new(GEMINI_DEFAULT_URL, None, Duration::from_secs(5));
        let selector = ModelSelector::new(priorities(), "gemini-pro", Duration::from_secs(60));
        assert_eq!(selector.current(&client).await, "gemini-pro");
        assert!(selector.fresh().await.is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_chat_errors() {
        let client = GeminiClient::new(GEMINI_DEFAULT_URL, None, Duration::from_secs(5));
        let service = ChatService::new(
            client,
            ModelSelector::new(priorities(), "gemini-pro", Duration::from_secs(60)),
            GenerationConfig::default(),
        );
        let request: ChatRequest = serde_json::from_str(r#"{"message": "hello"}"#).unwrap();
        assert!(matches!(service.respond(&request).await, Err(ProviderError::MissingApiKey)));
    }
}
