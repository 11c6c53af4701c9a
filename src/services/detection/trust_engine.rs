// Trust Engine
// Derives trust score, AI probability and verdict from an analysis record.
// The verdict cut points are product policy, kept as named constants.

use crate::models::{AnalysisRecord, CategoryScore, Verdict};
use std::collections::BTreeMap;
use thiserror::Error;

/// AI probability at or above which content is labeled AI-generated.
pub const AI_VERDICT_THRESHOLD: f64 = 65.0;
/// AI probability at or below which content is labeled human-created.
pub const HUMAN_VERDICT_THRESHOLD: f64 = 35.0;

const SCORE_MIN: f64 = 0.0;
const SCORE_MAX: f64 = 100.0;

/// Internal invariant violation: the record reaching the engine is malformed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Non-finite value in analysis field `{0}`")]
    NonFinite(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrustAssessment {
    pub trust_score: f64,
    pub ai_probability: f64,
    pub verdict: Verdict,
    /// Category scores clamped to 0-100, strongest first.
    pub ranked_categories: Vec<CategoryScore>,
    pub record: AnalysisRecord,
}

pub fn verdict_for(ai_probability: f64) -> Verdict {
    if ai_probability >= AI_VERDICT_THRESHOLD {
        Verdict::LikelyAiGenerated
    } else if ai_probability <= HUMAN_VERDICT_THRESHOLD {
        Verdict::LikelyHumanCreated
    } else {
        Verdict::Uncertain
    }
}

/// Clamp and order category scores, highest first (ties by name).
pub fn rank_categories(scores: &BTreeMap<String, f64>) -> Vec<CategoryScore> {
    let mut ranked: Vec<CategoryScore> = scores
        .iter()
        .map(|(name, score)| CategoryScore {
            category: name.clone(),
            score: score.clamp(SCORE_MIN, SCORE_MAX),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });
    ranked
}

fn ensure_finite(field: &str, value: f64) -> Result<(), SchemaError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SchemaError::NonFinite(field.to_string()))
    }
}

/// Score a record. Total over every well-formed record; only non-finite numbers fail.
pub fn compute_trust(record: AnalysisRecord) -> Result<TrustAssessment, SchemaError> {
    ensure_finite("aiPercentage", record.ai_percentage)?;
    ensure_finite("humanPercentage", record.human_percentage)?;
    for (name, score) in &record.category_scores {
        ensure_finite(&format!("categoryScores.{}", name), *score)?;
    }

    let ai_probability = record.ai_percentage.clamp(SCORE_MIN, SCORE_MAX);
    let trust_score = SCORE_MAX - ai_probability;

    Ok(TrustAssessment {
        trust_score,
        ai_probability,
        verdict: verdict_for(ai_probability),
        ranked_categories: rank_categories(&record.category_scores),
        record,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentKind;
    use crate::services::detection::fallback::fallback_record;
    use serde_json::Map;

    fn record(ai: f64) -> AnalysisRecord {
        AnalysisRecord {
            ai_percentage: ai,
            human_percentage: 100.0 - ai,
            category_scores: BTreeMap::from([
                ("texture".to_string(), 90.0),
                ("lighting".to_string(), 40.0),
                ("anatomy".to_string(), 90.0),
            ]),
            findings: vec!["uniform noise".to_string()],
            extra: Map::new(),
        }
    }

    #[test]
    fn test_verdict_boundaries() {
        assert_eq!(verdict_for(65.0), Verdict::LikelyAiGenerated);
        assert_eq!(verdict_for(64.99), Verdict::Uncertain);
        assert_eq!(verdict_for(35.0), Verdict::LikelyHumanCreated);
        assert_eq!(verdict_for(35.01), Verdict::Uncertain);
        assert_eq!(verdict_for(50.0), Verdict::Uncertain);
    }

    #[test]
    fn test_scores_complementary_and_clamped() {
        for ai in [-20.0, 0.0, 12.5, 50.0, 80.0, 100.0, 250.0] {
            let result = compute_trust(record(ai)).unwrap();
            assert!((0.0..=100.0).contains(&result.trust_score));
            assert!((0.0..=100.0).contains(&result.ai_probability));
            assert!((result.trust_score + result.ai_probability - 100.0).abs() < 1e-9);
        }
        assert_eq!(compute_trust(record(250.0)).unwrap().trust_score, 0.0);
        assert_eq!(compute_trust(record(-20.0)).unwrap().trust_score, 100.0);
    }

    #[test]
    fn test_rescoring_is_idempotent() {
        let first = compute_trust(record(50.0)).unwrap();
        let second = compute_trust(first.record.clone()).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.verdict, Verdict::Uncertain);
    }

    #[test]
    fn test_fallback_scores_uncertain() {
        for kind in ContentKind::ALL {
            let result = compute_trust(fallback_record(kind, "upstream down")).unwrap();
            assert_eq!(result.trust_score, 50.0);
            assert_eq!(result.verdict, Verdict::Uncertain);
        }
    }

    #[test]
    fn test_ranked_categories_order() {
        let result = compute_trust(record(80.0)).unwrap();
        let names: Vec<&str> = result.ranked_categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["anatomy", "texture", "lighting"]);
        assert_eq!(result.verdict, Verdict::LikelyAiGenerated);
        assert_eq!(result.trust_score, 20.0);
    }

    #[test]
    fn test_non_finite_is_schema_error() {
        let err = compute_trust(record(f64::NAN)).unwrap_err();
        assert_eq!(err, SchemaError::NonFinite("aiPercentage".to_string()));

        let mut bad = record(10.0);
        bad.category_scores.insert("lighting".to_string(), f64::INFINITY);
        let err = compute_trust(bad).unwrap_err();
        assert_eq!(err, SchemaError::NonFinite("categoryScores.lighting".to_string()));
    }
}
