use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Credential-shaped `key: value` / `key=value` pairs, regardless of which
/// literal pattern list is configured.
static CREDENTIAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"(?i)(password|secret|token|api[_-]?key|credential)\s*[:=]\s*\S+")
        .case_insensitive(true)
        .build()
        .expect("static credential redaction pattern must compile")
});

/// Case-insensitive literal replacement of each configured pattern, plus a
/// blanket credential-shaped-pair redaction applied unconditionally. Used
/// before any incident text reaches an LLM provider.
pub fn redact(text: &str, patterns: &[String]) -> String {
    let mut out = text.to_string();
    for pattern in patterns {
        if pattern.is_empty() {
            continue;
        }
        out = replace_case_insensitive(&out, pattern, "[REDACTED]");
    }
    CREDENTIAL_PATTERN.replace_all(&out, "$1=[REDACTED]").into_owned()
}

fn replace_case_insensitive(haystack: &str, needle: &str, replacement: &str) -> String {
    let lower_haystack = haystack.to_lowercase();
    let lower_needle = needle.to_lowercase();
    if lower_needle.is_empty() {
        return haystack.to_string();
    }

    let mut result = String::with_capacity(haystack.len());
    let mut start = 0;
    while let Some(idx) = lower_haystack[start..].find(&lower_needle) {
        let match_start = start + idx;
        let match_end = match_start + needle.len();
        result.push_str(&haystack[start..match_start]);
        result.push_str(replacement);
        start = match_end;
    }
    result.push_str(&haystack[start..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_literal_patterns_case_insensitively() {
        let out = redact("The API_KEY value leaked", &["api_key".to_string()]);
        assert_eq!(out, "The [REDACTED] value leaked");
    }

    #[test]
    fn redacts_credential_shaped_pairs_even_without_a_matching_literal() {
        let out = redact("password: hunter2 and token=abc123", &[]);
        assert_eq!(out, "password=[REDACTED] and token=[REDACTED]");
    }

    #[test]
    fn leaves_unrelated_text_untouched() {
        let out = redact("the server restarted cleanly", &["password".to_string()]);
        assert_eq!(out, "the server restarted cleanly");
    }
}
