// Detection Module
// Forensic scoring pipeline organized into specialized submodules:
// - prompts: per-kind forensic prompts
// - extractor: recovers the JSON analysis object from free-form model output
// - fallback: neutral record policy for failed analyses
// - trust_engine: trust score, AI probability and verdict
// - explanation: deterministic human-readable rationale
// - analyzer: per-kind adapters tying the model call to the pipeline

pub mod analyzer;
pub mod explanation;
pub mod extractor;
pub mod fallback;
pub mod prompts;
pub mod trust_engine;

// Re-export commonly used items
pub use analyzer::{build_response, score_raw_response, Analyzer, ModelAnalysis, Upload};
pub use explanation::{generate_explanation, DISCLAIMER};
pub use extractor::{extract, extract_json_object, strip_code_fences, validate_record, ExtractionError};
pub use fallback::{
    fallback_record,
    resolve_analysis,
    AnalysisOutcome,
    DegradeReason,
    NEUTRAL_SCORE,
};
pub use prompts::{analysis_prompt, text_analysis_prompt};
pub use trust_engine::{
    compute_trust,
    verdict_for,
    SchemaError,
    TrustAssessment,
    AI_VERDICT_THRESHOLD,
    HUMAN_VERDICT_THRESHOLD,
};
