// Forensic Prompts
// One prompt per content kind. Every prompt asks for the same core JSON shape
// so the extractor and trust engine stay content-type agnostic.

use crate::models::ContentKind;

const PROMPT_RULES: &str = r#"Rules:
- Percentages must be internally consistent
- Category scores (0 = clearly human, 100 = clearly AI/manipulated) must justify aiPercentage
- Be conservative; avoid absolute certainty
- Do NOT say 'real' or 'fake'
- Do NOT mention AI models or tools
- Return ONLY the JSON object, no commentary"#;

fn subject(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Image => "the provided image for indicators of AI generation or digital manipulation",
        ContentKind::Text => "the provided text for indicators of AI authorship",
        ContentKind::Email => "the provided email for indicators of AI authorship, impersonation or phishing",
        ContentKind::Audio => "the provided audio for indicators of voice cloning or synthetic speech",
        ContentKind::Video => "the provided video for indicators of deepfake manipulation or synthetic generation",
        ContentKind::Document => "the provided document text for indicators of AI authorship or tampering",
    }
}

fn focus(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Image => "GAN noise, texture uniformity, lighting coherence, edge inconsistencies, anatomical errors, background semantics",
        ContentKind::Text => "perplexity variance, burstiness, repetition entropy, semantic drift, stylistic uniformity",
        ContentKind::Email => "tone and phrasing, sender/signature consistency, urgency pressure, link and attachment lures, template-like formatting",
        ContentKind::Audio => "spectral consistency, phase alignment, breath pattern realism, prosody, compression mismatch",
        ContentKind::Video => "temporal flicker, facial boundary blending, lip-sync alignment, lighting continuity, re-compression artifacts",
        ContentKind::Document => "language uniformity, structural templating, internal consistency, metadata or formatting anomalies",
    }
}

fn findings_hint(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Image | ContentKind::Video => "Findings must be visual or semantic observations only",
        ContentKind::Audio => "Findings must be acoustic observations only",
        _ => "Findings must quote or describe concrete passages",
    }
}

/// Full analysis prompt for `kind`.
pub fn analysis_prompt(kind: ContentKind) -> String {
    let categories = kind
        .categories()
        .iter()
        .map(|c| format!("    \"{}\": number (0-100)", c))
        .collect::<Vec<_>>()
        .join(",\n");

    let extra_fields = match kind {
        ContentKind::Email => "  \"phishingSignals\": [\"short description of a phishing indicator\"],\n",
        _ => "",
    };

    format!(
        r#"You are a digital forensic analysis system.

Analyze {subject}.

Examine: {focus}.

Return your response STRICTLY in the following JSON format:

{{
  "aiPercentage": number (0-100),
  "humanPercentage": number (0-100),
  "categoryScores": {{
{categories}
  }},
{extra_fields}  "findings": [
    "short factual observation",
    "short factual observation"
  ]
}}

{rules}
- {hint}
"#,
        subject = subject(kind),
        focus = focus(kind),
        categories = categories,
        extra_fields = extra_fields,
        rules = PROMPT_RULES,
        hint = findings_hint(kind),
    )
}

/// Prompt followed by the submitted text, for kinds analyzed as text.
pub fn text_analysis_prompt(kind: ContentKind, content: &str) -> String {
    format!(
        "{}\n[CONTENT START]\n{}\n[CONTENT END]\n",
        analysis_prompt(kind),
        content
    )
}
