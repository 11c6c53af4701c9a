// Explanation Generator
// Short, deterministic rationale built from the dominant categories and findings.

use crate::models::{AnalysisRecord, Verdict};

use super::trust_engine::{rank_categories, verdict_for};

const TOP_CATEGORIES: usize = 2;
const TOP_FINDINGS: usize = 3;
pub const DISCLAIMER: &str =
    "This analysis provides a probabilistic assessment and is not legal proof.";

fn lead_sentence(ai_probability: f64) -> String {
    match verdict_for(ai_probability) {
        Verdict::LikelyAiGenerated => format!(
            "Indicators suggest a high likelihood of AI generation or manipulation ({:.0}% AI probability).",
            ai_probability
        ),
        Verdict::LikelyHumanCreated => format!(
            "Indicators suggest the content is likely human-created ({:.0}% AI probability).",
            ai_probability
        ),
        Verdict::Uncertain => format!(
            "The analysis is inconclusive ({:.0}% AI probability).",
            ai_probability
        ),
    }
}

fn humanize(category: &str) -> String {
    category.replace('_', " ")
}

pub fn generate_explanation(record: &AnalysisRecord, ai_probability: f64) -> String {
    let mut sentences = vec![lead_sentence(ai_probability)];

    let ranked = rank_categories(&record.category_scores);
    if !ranked.is_empty() {
        let strongest: Vec<String> = ranked
            .iter()
            .take(TOP_CATEGORIES)
            .map(|c| format!("{} ({:.0})", humanize(&c.category), c.score))
            .collect();
        sentences.push(format!("Strongest category signals: {}.", strongest.join(", ")));
    }

    let findings: Vec<&str> = record
        .findings
        .iter()
        .map(|f| f.trim().trim_end_matches('.'))
        .filter(|f| !f.is_empty())
        .take(TOP_FINDINGS)
        .collect();
    if findings.is_empty() {
        sentences.push("No specific findings were reported.".to_string());
    } else {
        sentences.push(format!("Key findings: {}.", findings.join("; ")));
    }

    sentences.push(DISCLAIMER.to_string());
    sentences.join(" ")
}
