// Analysis Adapters
// One entry point per content kind: build the prompt and model input, call the
// model, then run the extract -> fallback -> trust -> explanation pipeline.

use crate::models::{AnalysisDetails, AnalysisStatus, AnalyzeResponse, ContentKind};
use crate::services::document::{extract_document_text, media_from_upload};
use crate::services::providers::{GeminiClient, GenerationConfig, MediaPart, ProviderError};
use crate::services::text_processor::prepare_for_analysis;
use tracing::{info, warn};
use uuid::Uuid;

use super::explanation::generate_explanation;
use super::fallback::{degrade, resolve_analysis, AnalysisOutcome, DegradeReason};
use super::prompts::{analysis_prompt, text_analysis_prompt};
use super::trust_engine::{compute_trust, SchemaError};

/// Raw upload as received from a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Result of one adapter run, before scoring.
#[derive(Debug, Clone)]
pub struct ModelAnalysis {
    pub kind: ContentKind,
    pub outcome: AnalysisOutcome,
    /// Model that produced the record; `None` when degraded.
    pub model: Option<String>,
}

#[derive(Clone)]
pub struct Analyzer {
    client: GeminiClient,
    model: String,
    generation: GenerationConfig,
}

impl Analyzer {
    pub fn new(client: GeminiClient, model: impl Into<String>, generation: GenerationConfig) -> Self {
        Self {
            client,
            model: model.into(),
            generation,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn run(&self, kind: ContentKind, prompt: String, media: Option<MediaPart>) -> ModelAnalysis {
        info!(
            "[ANALYZER] {} analysis via {} (media: {})",
            kind,
            self.model,
            media.as_ref().map(|m| m.mime_type.as_str()).unwrap_or("none")
        );

        let result = self
            .client
            .generate(&self.model, &prompt, media.as_ref(), self.generation)
            .await;

        let model = result.as_ref().ok().map(|r| r.model.clone());
        let outcome = resolve_analysis(kind, result.map(|r| r.content));
        ModelAnalysis {
            kind,
            model: if outcome.is_degraded() { None } else { model },
            outcome,
        }
    }

    fn unsupported(kind: ContentKind, reason: String) -> ModelAnalysis {
        ModelAnalysis {
            kind,
            outcome: degrade(kind, DegradeReason::UnsupportedInput(reason)),
            model: None,
        }
    }

    /// Image, audio or video upload sent inline with the kind's prompt.
    pub async fn analyze_media(&self, kind: ContentKind, upload: Upload) -> ModelAnalysis {
        match media_from_upload(
            kind,
            upload.content_type.as_deref(),
            upload.file_name.as_deref(),
            upload.bytes,
        ) {
            Ok(media) => self.run(kind, analysis_prompt(kind), Some(media)).await,
            Err(e) => Self::unsupported(kind, e.to_string()),
        }
    }

    pub async fn analyze_image(&self, upload: Upload) -> ModelAnalysis {
        self.analyze_media(ContentKind::Image, upload).await
    }

    pub async fn analyze_audio(&self, upload: Upload) -> ModelAnalysis {
        self.analyze_media(ContentKind::Audio, upload).await
    }

    pub async fn analyze_video(&self, upload: Upload) -> ModelAnalysis {
        self.analyze_media(ContentKind::Video, upload).await
    }

    /// Text-like content. `content` is normalized and bounded before prompting.
    pub async fn analyze_text_as(&self, kind: ContentKind, content: &str) -> ModelAnalysis {
        let prepared = prepare_for_analysis(content);
        if prepared.is_empty() {
            return Self::unsupported(kind, "empty text".to_string());
        }
        self.run(kind, text_analysis_prompt(kind, &prepared), None).await
    }

    pub async fn analyze_text(&self, content: &str) -> ModelAnalysis {
        self.analyze_text_as(ContentKind::Text, content).await
    }

    pub async fn analyze_email(&self, content: &str) -> ModelAnalysis {
        self.analyze_text_as(ContentKind::Email, content).await
    }

    /// PDF/DOCX parsing is CPU-bound, so it runs on the blocking pool.
    pub async fn analyze_document(&self, upload: Upload) -> ModelAnalysis {
        let kind = ContentKind::Document;
        let Upload { file_name, bytes, .. } = upload;
        let file_name = file_name.unwrap_or_else(|| "upload".to_string());

        let extracted =
            tokio::task::spawn_blocking(move || extract_document_text(&file_name, &bytes)).await;
        match extracted {
            Ok(Ok(text)) => self.analyze_text_as(kind, &text).await,
            Ok(Err(e)) => Self::unsupported(kind, e.to_string()),
            Err(e) => {
                warn!("[ANALYZER] document extraction task failed: {}", e);
                Self::unsupported(kind, format!("document extraction failed: {}", e))
            }
        }
    }

    /// Dispatch a multipart upload: documents go through text extraction, media is sent inline.
    pub async fn analyze_upload(&self, kind: ContentKind, upload: Upload) -> ModelAnalysis {
        match kind {
            ContentKind::Document => self.analyze_document(upload).await,
            _ => self.analyze_media(kind, upload).await,
        }
    }
}

/// Score a model analysis and assemble the response body.
pub fn build_response(analysis: ModelAnalysis) -> Result<AnalyzeResponse, SchemaError> {
    let ModelAnalysis { kind, outcome, model } = analysis;
    let (status, degraded_reason) = match outcome.reason() {
        Some(reason) => (AnalysisStatus::Degraded, Some(reason.to_string())),
        None => (AnalysisStatus::Ok, None),
    };

    let assessment = compute_trust(outcome.into_record())?;
    let explanation = generate_explanation(&assessment.record, assessment.ai_probability);

    info!(
        "[ANALYZER] {} scored: trust={:.1} verdict={} status={:?}",
        kind, assessment.trust_score, assessment.verdict, status
    );

    Ok(AnalyzeResponse {
        trust_score: assessment.trust_score,
        deepfake_probability: assessment.ai_probability,
        verdict: assessment.verdict,
        explanation,
        details: AnalysisDetails {
            content_type: kind,
            model,
            ranked_categories: assessment.ranked_categories,
            record: assessment.record,
        },
        status,
        degraded_reason,
        request_id: Uuid::new_v4().to_string(),
    })
}

/// Offline path: score a captured raw model response for `kind`.
pub fn score_raw_response(kind: ContentKind, raw: &str) -> Result<AnalyzeResponse, SchemaError> {
    let outcome = resolve_analysis::<ProviderError>(kind, Ok(raw.to_string()));
    build_response(ModelAnalysis {
        kind,
        outcome,
        model: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Verdict;
    use crate::services::providers::GEMINI_DEFAULT_URL;
    use std::time::Duration;

    fn offline_analyzer() -> Analyzer {
        let client = GeminiClient::new(GEMINI_DEFAULT_URL, None, Duration::from_secs(5));
        Analyzer::new(client, "gemini-2.5-pro", GenerationConfig::default())
    }

    #[test]
    fn test_fenced_response_scores_ai() {
        let raw = "Here is my analysis:\n```json\n{\"aiPercentage\": 80, \"humanPercentage\": 20, \"categoryScores\": {\"texture\": 85}, \"findings\": [\"smooth skin\"]}\n```";
        let response = score_raw_response(ContentKind::Image, raw).unwrap();
        assert_eq!(response.trust_score, 20.0);
        assert_eq!(response.deepfake_probability, 80.0);
        assert_eq!(response.verdict, Verdict::LikelyAiGenerated);
        assert_eq!(response.status, AnalysisStatus::Ok);
        assert!(response.degraded_reason.is_none());
        assert!(response.explanation.contains("smooth skin"));
        assert!(Uuid::parse_str(&response.request_id).is_ok());
    }

    #[test]
    fn test_prose_response_degrades() {
        let response = score_raw_response(ContentKind::Text, "I cannot analyze this.").unwrap();
        assert_eq!(response.trust_score, 50.0);
        assert_eq!(response.verdict, Verdict::Uncertain);
        assert_eq!(response.status, AnalysisStatus::Degraded);
        assert!(response.degraded_reason.is_some());
    }

    #[test]
    fn test_response_serialization_shape() {
        let response = score_raw_response(ContentKind::Email, "nothing").unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "degraded");
        assert_eq!(value["verdict"], "Uncertain");
        assert_eq!(value["details"]["contentType"], "email");
        assert_eq!(value["details"]["aiPercentage"], 50.0);
        assert!(value["details"]["phishingSignals"].is_array());
        assert!(value.get("request_id").is_some());
    }

    #[test]
    fn test_details_keys_not_duplicated() {
        let raw = r#"{"aiPercentage": 30, "humanPercentage": 70, "categoryScores": {"texture": 20},
            "findings": [], "contentType": "photo", "model": "m", "rankedCategories": "x"}"#;
        let response = score_raw_response(ContentKind::Image, raw).unwrap();
        let json = serde_json::to_string(&response.details).unwrap();
        assert_eq!(json.matches("\"contentType\"").count(), 1);
        assert_eq!(json.matches("\"rankedCategories\"").count(), 1);
        assert!(!json.contains("\"model\""));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["contentType"], "image");
    }

    #[tokio::test]
    async fn test_unconfigured_model_degrades() {
        let analysis = offline_analyzer().analyze_text("Some text worth checking.").await;
        assert_eq!(analysis.outcome.reason().map(|r| r.code()), Some("model_unavailable"));
        assert!(analysis.model.is_none());
        let response = build_response(analysis).unwrap();
        assert_eq!(response.trust_score, 50.0);
    }

    #[tokio::test]
    async fn test_unsupported_media_degrades() {
        let upload = Upload {
            file_name: Some("notes.txt".to_string()),
            content_type: Some("text/plain".to_string()),
            bytes: b"hello".to_vec(),
        };
        let analysis = offline_analyzer().analyze_image(upload).await;
        assert_eq!(analysis.outcome.reason().map(|r| r.code()), Some("unsupported_input"));
    }

    #[tokio::test]
    async fn test_document_extraction_failure_degrades() {
        let upload = Upload {
            file_name: Some("scan.docx".to_string()),
            content_type: None,
            bytes: b"garbage".to_vec(),
        };
        let analysis = offline_analyzer().analyze_document(upload).await;
        assert_eq!(analysis.kind, ContentKind::Document);
        assert_eq!(analysis.outcome.reason().map(|r| r.code()), Some("unsupported_input"));
    }

    #[tokio::test]
    async fn test_document_text_reaches_model_stage() {
        let upload = Upload {
            file_name: Some("memo.md".to_string()),
            content_type: None,
            bytes: b"# Memo\n\nQuarterly figures attached.".to_vec(),
        };
        let analysis = offline_analyzer().analyze_upload(ContentKind::Document, upload).await;
        assert_eq!(analysis.kind, ContentKind::Document);
        assert_eq!(analysis.outcome.reason().map(|r| r.code()), Some("model_unavailable"));
    }

    #[tokio::test]
    async fn test_text_kind_upload_treated_as_media() {
        let upload = Upload {
            file_name: Some("notes.txt".to_string()),
            content_type: Some("text/plain".to_string()),
            bytes: b"hello".to_vec(),
        };
        let analysis = offline_analyzer().analyze_upload(ContentKind::Text, upload).await;
        assert_eq!(analysis.outcome.reason().map(|r| r.code()), Some("unsupported_input"));
    }
}
