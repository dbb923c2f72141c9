//! Tokenization and normalization primitives shared by every spectral and
//! labeling component.

use std::sync::OnceLock;

use regex::Regex;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[a-z0-9]+(?:[_'-][a-z0-9]+)*").unwrap())
}

// `regex` has no lookbehind, so the sentence boundary (punctuation immediately
// followed by whitespace) is matched directly instead of via `(?<=[.!?])\s+`.
fn sentence_boundary_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[.!?]\s+").unwrap())
}

/// Lowercases and extracts tokens matching the fixed token pattern.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    token_pattern()
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Normalizes a candidate term: lowercase, strip, re-join its tokens with single spaces.
/// Falls back to the trimmed/lowercased value if it contains no tokens at all.
pub fn normalize_term(value: &str) -> String {
    let normalized = value.trim().to_lowercase();
    let tokens = tokenize(&normalized);
    if tokens.is_empty() {
        return normalized;
    }
    tokens.join(" ")
}

/// True if `term_tokens` appears as a contiguous subsequence of `tokens`.
pub fn token_sequence_contains(tokens: &[String], term_tokens: &[String]) -> bool {
    if term_tokens.is_empty() {
        return false;
    }
    let window = term_tokens.len();
    if window > tokens.len() {
        return false;
    }
    tokens.windows(window).any(|w| w == term_tokens)
}

/// Splits text on sentence-ending punctuation, dropping empty segments.
/// The terminal punctuation stays attached to the sentence it ends.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut last = 0;
    for m in sentence_boundary_pattern().find_iter(text) {
        let punct_end = m.start() + 1;
        segments.push(text[last..punct_end].trim().to_string());
        last = m.end();
    }
    segments.push(text[last..].trim().to_string());
    segments.retain(|s| !s.is_empty());
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_punctuation_and_lowercases() {
        let tokens = tokenize("Hello, WORLD! This is self-aware.");
        assert_eq!(
            tokens,
            vec!["hello", "world", "this", "is", "self-aware"]
        );
    }

    #[test]
    fn tokenize_keeps_apostrophes_and_underscores_inside_tokens() {
        let tokens = tokenize("don't split_me or re-think");
        assert_eq!(tokens, vec!["don't", "split_me", "or", "re-think"]);
    }

    #[test]
    fn normalize_term_joins_on_single_spaces() {
        assert_eq!(normalize_term("  Some   Term! "), "some term");
    }

    #[test]
    fn normalize_term_falls_back_when_no_tokens() {
        assert_eq!(normalize_term("   ---   "), "---");
    }

    #[test]
    fn token_sequence_contains_finds_subsequence() {
        let tokens = tokenize("a quick brown fox jumps");
        let term = tokenize("brown fox");
        assert!(token_sequence_contains(&tokens, &term));
    }

    #[test]
    fn token_sequence_contains_rejects_out_of_order() {
        let tokens = tokenize("fox brown quick a");
        let term = tokenize("brown fox");
        assert!(!token_sequence_contains(&tokens, &term));
    }

    #[test]
    fn token_sequence_contains_empty_term_is_false() {
        let tokens = tokenize("anything at all");
        assert!(!token_sequence_contains(&tokens, &[]));
    }

    #[test]
    fn split_sentences_splits_on_terminal_punctuation() {
        let sentences = split_sentences("First one. Second one! Third one?");
        assert_eq!(sentences, vec!["First one.", "Second one!", "Third one?"]);
    }

    #[test]
    fn split_sentences_drops_empty_segments() {
        let sentences = split_sentences("Only one sentence without terminal punctuation");
        assert_eq!(sentences, vec!["Only one sentence without terminal punctuation"]);
    }
}
