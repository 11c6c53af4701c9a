// Response Extractor
// Recovers the analysis JSON object from free-form model output.
// Models wrap the payload in prose or markdown fences, so the text is cleaned
// first and then scanned with a depth-counting brace matcher that skips over
// string literals.

use crate::models::{AnalysisDetails, AnalysisRecord, ContentKind};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("No JSON object found in model response")]
    NoJsonObject,
    #[error("Unbalanced braces in model response (output truncated?)")]
    Unbalanced,
    #[error("JSON parse error: {0}")]
    InvalidJson(String),
    #[error("Incomplete analysis JSON, missing: {}", .0.join(", "))]
    MissingKeys(Vec<String>),
    #[error("Invalid analysis field: {0}")]
    InvalidField(String),
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```[A-Za-z0-9_+\-]*[ \t]*(\r?\n)?").expect("fence regex"))
}

/// Remove markdown code-fence markers (tagged or bare) anywhere in the text.
pub fn strip_code_fences(text: &str) -> String {
    fence_re().replace_all(text, "").into_owned()
}

/// Length in bytes of the object opening at `text[0]`, or `None` if it never closes.
fn matching_brace_len(text: &str) -> Option<usize> {
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Top-level brace-delimited spans in order of appearance.
/// A brace that never closes is skipped and scanning resumes after it; the
/// second value reports whether any such brace was seen.
fn candidate_objects(text: &str) -> (Vec<&str>, bool) {
    let mut candidates = Vec::new();
    let mut unbalanced = false;
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('{') {
        let start = pos + offset;
        match matching_brace_len(&text[start..]) {
            Some(len) => {
                candidates.push(&text[start..start + len]);
                pos = start + len;
            }
            None => {
                unbalanced = true;
                pos = start + 1;
            }
        }
    }
    (candidates, unbalanced)
}

struct ScannedObjects {
    objects: Vec<Map<String, Value>>,
    last_err: Option<String>,
    unbalanced: bool,
}

fn scan_objects(raw: &str) -> ScannedObjects {
    let cleaned = strip_code_fences(raw.trim());
    let (candidates, unbalanced) = candidate_objects(&cleaned);

    let mut objects = Vec::new();
    let mut last_err: Option<String> = None;
    for candidate in candidates {
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => objects.push(map),
            Ok(_) => {}
            Err(e) => {
                debug!("[EXTRACTOR] candidate rejected ({} bytes): {}", candidate.len(), e);
                last_err = Some(e.to_string());
            }
        }
    }
    ScannedObjects {
        objects,
        last_err,
        unbalanced,
    }
}

fn scan_failure(unbalanced: bool, last_err: Option<String>) -> ExtractionError {
    if unbalanced {
        ExtractionError::Unbalanced
    } else if let Some(e) = last_err {
        ExtractionError::InvalidJson(e)
    } else {
        ExtractionError::NoJsonObject
    }
}

/// Locate and parse the first well-formed JSON object embedded in `raw`.
pub fn extract_json_object(raw: &str) -> Result<Map<String, Value>, ExtractionError> {
    let ScannedObjects {
        objects,
        last_err,
        unbalanced,
    } = scan_objects(raw);
    objects
        .into_iter()
        .next()
        .ok_or_else(|| scan_failure(unbalanced, last_err))
}

/// Check required keys for `kind` and convert the object into a typed record.
pub fn validate_record(
    map: Map<String, Value>,
    kind: ContentKind,
) -> Result<AnalysisRecord, ExtractionError> {
    let missing: Vec<String> = kind
        .required_keys()
        .into_iter()
        .filter(|key| map.get(*key).map_or(true, Value::is_null))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(ExtractionError::MissingKeys(missing));
    }

    let mut record: AnalysisRecord = serde_json::from_value(Value::Object(map))
        .map_err(|e| ExtractionError::InvalidField(e.to_string()))?;
    for key in AnalysisDetails::RESERVED_KEYS {
        if record.extra.remove(key).is_some() {
            debug!("[EXTRACTOR] dropped reserved key from model output: {}", key);
        }
    }
    Ok(record)
}

/// Extract a validated [`AnalysisRecord`] for `kind` from raw model text.
/// The first object that validates wins. When none does, an unclosed brace is
/// reported ahead of the first validation error, since truncation is the likelier cause.
pub fn extract(raw: &str, kind: ContentKind) -> Result<AnalysisRecord, ExtractionError> {
    let ScannedObjects {
        objects,
        last_err,
        unbalanced,
    } = scan_objects(raw);

    let mut first_err: Option<ExtractionError> = None;
    for map in objects {
        match validate_record(map, kind) {
            Ok(record) => return Ok(record),
            Err(e) => {
                debug!("[EXTRACTOR] object rejected for {}: {}", kind, e);
                first_err.get_or_insert(e);
            }
        }
    }

    match first_err {
        Some(_) if unbalanced => Err(ExtractionError::Unbalanced),
        Some(e) => Err(e),
        None => Err(scan_failure(unbalanced, last_err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{"aiPercentage": 80, "humanPercentage": 20, "categoryScores": {"texture": 85, "lighting": 70}, "findings": ["x"]}"#;

    #[test]
    fn test_extract_plain_object() {
        let record = extract(PAYLOAD, ContentKind::Image).unwrap();
        assert_eq!(record.ai_percentage, 80.0);
        assert_eq!(record.human_percentage, 20.0);
        assert_eq!(record.category_scores["texture"], 85.0);
        assert_eq!(record.findings, vec!["x".to_string()]);
    }

    #[test]
    fn test_extract_fenced_with_prose() {
        let raw = format!("Here is the result:\n```json\n{}\n```\nLet me know if you need more.", PAYLOAD);
        let record = extract(&raw, ContentKind::Image).unwrap();
        assert_eq!(record.ai_percentage, 80.0);
        assert_eq!(record.category_scores.len(), 2);
    }

    #[test]
    fn test_extract_fence_without_newlines() {
        let raw = format!("```json{}```", PAYLOAD);
        assert!(extract(&raw, ContentKind::Image).is_ok());
        let raw = format!("```{}```", PAYLOAD);
        assert!(extract(&raw, ContentKind::Image).is_ok());
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let raw = r#"{"aiPercentage": 40, "humanPercentage": 60, "categoryScores": {},
            "findings": ["template uses {braces}", "quote \" then }"]} trailing }"#;
        let record = extract(raw, ContentKind::Text).unwrap();
        assert_eq!(record.findings.len(), 2);
        assert_eq!(record.findings[1], "quote \" then }");
    }

    #[test]
    fn test_skips_prose_braces_before_payload() {
        let raw = format!("Fields use {{name}} placeholders. Result: {}", PAYLOAD);
        let record = extract(&raw, ContentKind::Image).unwrap();
        assert_eq!(record.ai_percentage, 80.0);
    }

    #[test]
    fn test_stray_open_brace_before_fenced_payload() {
        let raw = format!("Sure {{ let me check.\n```json\n{}\n```", PAYLOAD);
        let record = extract(&raw, ContentKind::Image).unwrap();
        assert_eq!(record.ai_percentage, 80.0);
        assert_eq!(record.category_scores["texture"], 85.0);
    }

    #[test]
    fn test_stray_open_brace_without_payload_is_unbalanced() {
        let err = extract("Sure { let me check.", ContentKind::Image).unwrap_err();
        assert_eq!(err, ExtractionError::Unbalanced);
    }

    #[test]
    fn test_reserved_keys_dropped_from_extra() {
        let raw = PAYLOAD.replace(
            "\"findings\"",
            "\"contentType\": \"photo\", \"model\": \"m\", \"rankedCategories\": [], \"notes\": \"kept\", \"findings\"",
        );
        let record = extract(&raw, ContentKind::Image).unwrap();
        for key in AnalysisDetails::RESERVED_KEYS {
            assert!(!record.extra.contains_key(key), "{} leaked into extra", key);
        }
        assert_eq!(record.extra["notes"], Value::from("kept"));
    }

    #[test]
    fn test_first_object_wins() {
        let second = PAYLOAD.replace("80", "10");
        let raw = format!("{}\n{}", PAYLOAD, second);
        let record = extract(&raw, ContentKind::Image).unwrap();
        assert_eq!(record.ai_percentage, 80.0);
    }

    #[test]
    fn test_extra_fields_preserved() {
        let raw = r#"{"aiPercentage": 55.5, "humanPercentage": 44.5, "categoryScores": {"style": 60},
            "findings": [], "reasoning": "mixed signals"}"#;
        let record = extract(raw, ContentKind::Text).unwrap();
        assert_eq!(record.ai_percentage, 55.5);
        assert_eq!(record.extra["reasoning"], Value::from("mixed signals"));
    }

    #[test]
    fn test_invalid_first_object_skipped() {
        let raw = format!("{{\"aiPercentage\": 90}} then {}", PAYLOAD);
        let record = extract(&raw, ContentKind::Image).unwrap();
        assert_eq!(record.ai_percentage, 80.0);
    }

    #[test]
    fn test_no_json_object() {
        let err = extract("I cannot analyze this image.", ContentKind::Image).unwrap_err();
        assert_eq!(err, ExtractionError::NoJsonObject);
    }

    #[test]
    fn test_truncated_output_is_unbalanced() {
        let raw = r#"{"aiPercentage": 80, "categoryScores": {"texture": 70}, "findings": ["cut"#;
        let err = extract(raw, ContentKind::Image).unwrap_err();
        assert_eq!(err, ExtractionError::Unbalanced);
    }

    #[test]
    fn test_invalid_json() {
        let err = extract("{aiPercentage: 80}", ContentKind::Image).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidJson(_)));
    }

    #[test]
    fn test_missing_keys_reported() {
        let err = extract(r#"{"aiPercentage": 80, "findings": null}"#, ContentKind::Image).unwrap_err();
        match err {
            ExtractionError::MissingKeys(keys) => {
                assert_eq!(keys, vec!["humanPercentage", "categoryScores", "findings"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_email_requires_phishing_signals() {
        let err = extract(PAYLOAD, ContentKind::Email).unwrap_err();
        assert_eq!(err, ExtractionError::MissingKeys(vec!["phishingSignals".to_string()]));

        let raw = PAYLOAD.replace("\"findings\"", "\"phishingSignals\": [\"urgent tone\"], \"findings\"");
        let record = extract(&raw, ContentKind::Email).unwrap();
        assert_eq!(record.extra["phishingSignals"][0], Value::from("urgent tone"));
    }

    #[test]
    fn test_wrong_field_type() {
        let raw = r#"{"aiPercentage": "high", "humanPercentage": 20, "categoryScores": {}, "findings": []}"#;
        let err = extract(raw, ContentKind::Image).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidField(_)));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}\n");
        assert_eq!(strip_code_fences("```{}```"), "{}");
    }
}
