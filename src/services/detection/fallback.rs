// Fallback Policy (FallbackOnError)
// Any extraction or upstream failure becomes a neutral 50/50 record so the
// analysis pipeline is total. The outcome stays tagged as degraded so callers
// can tell a failed analysis from a genuinely uncertain one.

use crate::models::{AnalysisRecord, ContentKind};
use crate::services::providers::ProviderError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use super::extractor::{extract, ExtractionError};

/// Midpoint used for every score in a fallback record.
pub const NEUTRAL_SCORE: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub enum DegradeReason {
    /// No API key configured or the client could not be built.
    ModelUnavailable(String),
    /// The model call failed (network, auth, quota, empty answer).
    ModelError(String),
    /// The model answered but no valid analysis could be recovered.
    Extraction(ExtractionError),
    /// The upload could not be turned into model input.
    UnsupportedInput(String),
}

impl DegradeReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::ModelError(_) => "model_error",
            Self::Extraction(_) => "extraction_failed",
            Self::UnsupportedInput(_) => "unsupported_input",
        }
    }
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelUnavailable(msg) => write!(f, "model unavailable: {}", msg),
            Self::ModelError(msg) => write!(f, "model call failed: {}", msg),
            Self::Extraction(e) => write!(f, "{}", e),
            Self::UnsupportedInput(msg) => write!(f, "unsupported input: {}", msg),
        }
    }
}

impl From<ProviderError> for DegradeReason {
    fn from(err: ProviderError) -> Self {
        if matches!(err, ProviderError::MissingApiKey) {
            Self::ModelUnavailable(err.to_string())
        } else {
            Self::ModelError(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Analyzed(AnalysisRecord),
    Degraded {
        record: AnalysisRecord,
        reason: DegradeReason,
    },
}

impl AnalysisOutcome {
    pub fn record(&self) -> &AnalysisRecord {
        match self {
            Self::Analyzed(record) | Self::Degraded { record, .. } => record,
        }
    }

    pub fn into_record(self) -> AnalysisRecord {
        match self {
            Self::Analyzed(record) | Self::Degraded { record, .. } => record,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&DegradeReason> {
        match self {
            Self::Analyzed(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }
}

/// Neutral record for `kind`: every score at the midpoint and one finding naming the cause.
pub fn fallback_record(kind: ContentKind, cause: &str) -> AnalysisRecord {
    let category_scores: BTreeMap<String, f64> = kind
        .categories()
        .iter()
        .map(|name| (name.to_string(), NEUTRAL_SCORE))
        .collect();

    let mut extra = Map::new();
    for key in kind.extra_required_keys() {
        extra.insert(key.to_string(), Value::Array(Vec::new()));
    }

    AnalysisRecord {
        ai_percentage: NEUTRAL_SCORE,
        human_percentage: NEUTRAL_SCORE,
        category_scores,
        findings: vec![format!("Model analysis failed safely: {}", cause)],
        extra,
    }
}

/// Build a degraded outcome for `kind`.
pub fn degrade(kind: ContentKind, reason: DegradeReason) -> AnalysisOutcome {
    warn!("[FALLBACK] {} analysis degraded ({}): {}", kind, reason.code(), reason);
    AnalysisOutcome::Degraded {
        record: fallback_record(kind, &reason.to_string()),
        reason,
    }
}

/// Apply the fallback policy to the result of a model call.
pub fn resolve_analysis<E>(kind: ContentKind, raw: Result<String, E>) -> AnalysisOutcome
where
    E: Into<DegradeReason>,
{
    match raw {
        Ok(text) => match extract(&text, kind) {
            Ok(record) => AnalysisOutcome::Analyzed(record),
            Err(e) => degrade(kind, DegradeReason::Extraction(e)),
        },
        Err(e) => degrade(kind, e.into()),
    }
}
