// Authenex Data Models
// Shared by the scoring pipeline, the model adapters and the HTTP layer

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Keys every analysis payload must carry, whatever the content type.
pub const CORE_REQUIRED_KEYS: [&str; 4] = [
    "aiPercentage",
    "humanPercentage",
    "categoryScores",
    "findings",
];

// ============ Content Kinds ============

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Image,
    Text,
    Email,
    Audio,
    Video,
    Document,
}

impl ContentKind {
    pub const ALL: [ContentKind; 6] = [
        ContentKind::Image,
        ContentKind::Text,
        ContentKind::Email,
        ContentKind::Audio,
        ContentKind::Video,
        ContentKind::Document,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Text => "text",
            Self::Email => "email",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Document => "document",
        }
    }

    pub fn parse(val: &str) -> Option<Self> {
        let val = val.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|k| k.as_str() == val)
    }

    /// Category names the model is asked to score for this kind.
    pub fn categories(&self) -> &'static [&'static str] {
        match self {
            Self::Image => &["texture", "lighting", "anatomy", "background", "semantics"],
            Self::Text => &["perplexity", "burstiness", "repetition", "semantic_drift", "style"],
            Self::Email => &["language", "sender_consistency", "urgency", "links", "formatting"],
            Self::Audio => &["spectral", "phase", "breathing", "prosody", "compression"],
            Self::Video => &["temporal", "facial", "lip_sync", "lighting", "compression"],
            Self::Document => &["language", "structure", "consistency", "metadata", "formatting"],
        }
    }

    /// Keys required on top of [`CORE_REQUIRED_KEYS`].
    pub fn extra_required_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Email => &["phishingSignals"],
            _ => &[],
        }
    }

    pub fn required_keys(&self) -> Vec<&'static str> {
        CORE_REQUIRED_KEYS
            .iter()
            .chain(self.extra_required_keys())
            .copied()
            .collect()
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============ Analysis Record ============

/// Normalized model payload. Unknown keys emitted by the model are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub ai_percentage: f64,
    pub human_percentage: f64,
    #[serde(deserialize_with = "deserialize_scores")]
    pub category_scores: BTreeMap<String, f64>,
    pub findings: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// Models sometimes answer `null` for a category that does not apply (e.g. anatomy
// on a landscape); those are dropped rather than rejected.
fn deserialize_scores<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Option<f64>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(name, score)| score.map(|s| (name, s)))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    pub score: f64,
}

// ============ Verdict ============

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Likely AI-Generated")]
    LikelyAiGenerated,
    #[serde(rename = "Likely Human-Created")]
    LikelyHumanCreated,
    #[serde(rename = "Uncertain")]
    Uncertain,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LikelyAiGenerated => "Likely AI-Generated",
            Self::LikelyHumanCreated => "Likely Human-Created",
            Self::Uncertain => "Uncertain",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============ Analysis Response ============

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Ok,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDetails {
    pub content_type: ContentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub ranked_categories: Vec<CategoryScore>,
    #[serde(flatten)]
    pub record: AnalysisRecord,
}

impl AnalysisDetails {
    /// Keys owned by the details object itself; a record must not repeat them.
    pub const RESERVED_KEYS: [&'static str; 3] = ["contentType", "model", "rankedCategories"];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub trust_score: f64,
    pub deepfake_probability: f64,
    pub verdict: Verdict,
    pub explanation: String,
    pub details: AnalysisDetails,
    pub status: AnalysisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
    pub request_id: String,
}

/// JSON body for text and email analysis.
#[derive(Debug, Clone, Deserialize)]
pub struct TextPayload {
    #[serde(alias = "text", alias = "email")]
    pub content: String,
}

// ============ Chat ============

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    Voice,
    // Unknown modes read as plain text.
    #[default]
    #[serde(other)]
    Text,
}

/// One fragment of an incoming chat turn as the frontend sends it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HistoryPart {
    Plain(String),
    Labeled { text: String },
    Other(Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingTurn {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<HistoryPart>,
}

/// Flattened turn replayed to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub parts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<IncomingTurn>,
    #[serde(default)]
    pub mode: ChatMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub confidence: f64,
    pub risk_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatErrorEnvelope {
    pub response: String,
    pub error: String,
}

// ============ News ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub source: String,
    pub published_at: String,
    pub image_url: String,
    pub url: String,
    pub category: String,
    pub is_live: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsQuery {
    pub category: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsResponse {
    pub success: bool,
    pub category: String,
    pub count: usize,
    pub news: Vec<NewsItem>,
}

// ============ Health ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub service: String,
    pub status: String,
    pub version: String,
    pub gemini_configured: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_kind_parse() {
        assert_eq!(ContentKind::parse(" Email "), Some(ContentKind::Email));
        assert_eq!(ContentKind::parse("hologram"), None);
    }

    #[test]
    fn test_required_keys_per_kind() {
        assert_eq!(ContentKind::Image.required_keys(), CORE_REQUIRED_KEYS.to_vec());
        assert!(ContentKind::Email.required_keys().contains(&"phishingSignals"));
    }

    #[test]
    fn test_record_drops_null_scores_and_keeps_extra_keys() {
        let record: AnalysisRecord = serde_json::from_str(
            r#"{"aiPercentage": 70, "humanPercentage": 30,
                "categoryScores": {"texture": 80, "anatomy": null},
                "findings": ["smooth skin"], "note": "extra"}"#,
        )
        .unwrap();
        assert_eq!(record.ai_percentage, 70.0);
        assert_eq!(record.category_scores.len(), 1);
        assert_eq!(record.extra.get("note"), Some(&Value::from("extra")));
    }

    #[test]
    fn test_verdict_serializes_to_label() {
        let json = serde_json::to_string(&Verdict::LikelyHumanCreated).unwrap();
        assert_eq!(json, "\"Likely Human-Created\"");
    }

    #[test]
    fn test_chat_mode_defaults_to_text() {
        let req: ChatRequest = serde_json::from_str(r#"{"message": "hi", "mode": "shout"}"#).unwrap();
        assert_eq!(req.mode, ChatMode::Text);
        let req: ChatRequest = serde_json::from_str(r#"{"message": "hi", "mode": "voice"}"#).unwrap();
        assert_eq!(req.mode, ChatMode::Voice);
        let req: ChatRequest = serde_json::from_str(r#"{"message": "hi", "mode": "text"}"#).unwrap();
        assert_eq!(req.mode, ChatMode::Text);
        let req: ChatRequest = serde_json::from_str(r#"{"message": "hi"}"#).unwrap();
        assert_eq!(req.mode, ChatMode::Text);
    }

    #[test]
    fn test_text_payload_aliases() {
        let p: TextPayload = serde_json::from_str(r#"{"email": "Dear user"}"#).unwrap();
        assert_eq!(p.content, "Dear user");
        let p: TextPayload = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert_eq!(p.content, "hello");
    }
}
