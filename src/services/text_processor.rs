// Text Processing Service
// Cleans submitted text before it is embedded in an analysis prompt

use regex::Regex;
use std::sync::OnceLock;

/// Longest body (in chars) forwarded to the model.
pub const MAX_ANALYSIS_CHARS: usize = 60_000;

fn odd_space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\u{3000}\u{00A0}\u{2007}\u{202F}]").expect("space regex"))
}

fn horizontal_ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\x0C\x0B]+").expect("whitespace regex"))
}

fn blank_lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("blank line regex"))
}

/// Normalize quotes, dashes, spaces and line endings
pub fn normalize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    // Replace smart quotes
    let s = text
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{2013}', '\u{2014}'], "-")
        .replace('\u{200B}', "");

    let s = odd_space_re().replace_all(&s, " ");

    // Normalize line endings
    let s = s.replace("\r\n", "\n").replace('\r', "\n");

    let s = horizontal_ws_re().replace_all(&s, " ");

    // Strip each line
    let s = s.lines().map(|ln| ln.trim()).collect::<Vec<_>>().join("\n");

    blank_lines_re().replace_all(&s, "\n\n").trim().to_string()
}

/// Cut `text` to at most `max_chars` characters (not bytes).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Normalize then bound the body sent for analysis.
pub fn prepare_for_analysis(text: &str) -> String {
    let normalized = normalize_text(text);
    truncate_chars(&normalized, MAX_ANALYSIS_CHARS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_quotes_and_dashes() {
        let input = "Hello\u{201c}World\u{201d} it\u{2019}s \u{2014} fine";
        assert_eq!(normalize_text(input), "Hello\"World\" it's - fine");
    }

    #[test]
    fn test_normalize_whitespace_and_line_endings() {
        let input = "  Dear   user,\r\n\r\n\r\n\r\nPlease\u{00A0}\tverify \r\n";
        assert_eq!(normalize_text(input), "Dear user,\n\nPlease verify");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_prepare_bounds_length() {
        let long = "a".repeat(MAX_ANALYSIS_CHARS + 500);
        assert_eq!(prepare_for_analysis(&long).chars().count(), MAX_ANALYSIS_CHARS);
        assert_eq!(prepare_for_analysis("   "), "");
    }
}
