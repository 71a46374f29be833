//! Affirmative/negative answer classification.
//!
//! Confirmation answers are free-form text; this classifies them into a
//! closed verdict. The affirmative and negative phrase sets are disjoint,
//! and a negative token always wins over an affirmative one so a mixed
//! answer never commits an event.

use once_cell::sync::Lazy;
use regex::Regex;

/// Verdict for a confirmation answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affirmation {
    Yes,
    No,
    /// Matches neither set; the caller should re-ask.
    Unclear,
}

#[allow(clippy::unwrap_used)] // pattern literal is a compile-time constant
static EN_AFFIRMATIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u:\b)(?:y|yes|ok|okay)(?-u:\b)").unwrap());

#[allow(clippy::unwrap_used)] // pattern literal is a compile-time constant
static EN_NEGATIVE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?-u:\b)(?:n|no)(?-u:\b)").unwrap());

const JA_AFFIRMATIVE: [&str; 6] = ["はい", "登録", "進めて", "お願いします", "おねがいします", "実行"];
const JA_NEGATIVE: [&str; 5] = ["いいえ", "キャンセル", "やめる", "中止", "停止"];

/// Strip whitespace (including full-width) and common punctuation before
/// phrase matching.
fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '。' | '、' | ',' | '.' | '!' | '！' | '?' | '？'))
        .collect()
}

fn is_affirmative(lower: &str, compacted: &str) -> bool {
    EN_AFFIRMATIVE_RE.is_match(lower) || JA_AFFIRMATIVE.iter().any(|token| compacted.contains(token))
}

fn is_negative(lower: &str, compacted: &str) -> bool {
    EN_NEGATIVE_RE.is_match(lower) || JA_NEGATIVE.iter().any(|token| compacted.contains(token))
}

/// Classify a free-form confirmation answer.
pub fn classify(input: &str) -> Affirmation {
    let lower = input.trim().to_lowercase();
    let compacted = compact(&lower);

    // Negative first: an answer containing both reads as a refusal.
    if is_negative(&lower, &compacted) {
        return Affirmation::No;
    }
    if is_affirmative(&lower, &compacted) {
        return Affirmation::Yes;
    }

    Affirmation::Unclear
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn english_whole_word_tokens() {
        assert_eq!(classify("yes"), Affirmation::Yes);
        assert_eq!(classify("OK, go ahead"), Affirmation::Yes);
        assert_eq!(classify("y"), Affirmation::Yes);
        assert_eq!(classify("no"), Affirmation::No);
        assert_eq!(classify("n"), Affirmation::No);
    }

    #[test]
    fn whole_word_only_no_substring_hits() {
        // "okay" contains "ok" but "yesterday" must not read as yes,
        // and "note" must not read as no.
        assert_eq!(classify("yesterday"), Affirmation::Unclear);
        assert_eq!(classify("note"), Affirmation::Unclear);
        assert_eq!(classify("okay"), Affirmation::Yes);
    }

    #[test]
    fn japanese_phrases_with_punctuation() {
        assert_eq!(classify("はい。"), Affirmation::Yes);
        assert_eq!(classify("お願い します！"), Affirmation::Yes);
        assert_eq!(classify("登録して"), Affirmation::Yes);
        assert_eq!(classify("いいえ"), Affirmation::No);
        assert_eq!(classify("キャンセルで"), Affirmation::No);
    }

    #[test]
    fn negative_wins_over_affirmative() {
        assert_eq!(classify("はい、やっぱりキャンセル"), Affirmation::No);
        assert_eq!(classify("yes no"), Affirmation::No);
    }

    #[test]
    fn unrelated_text_is_unclear() {
        assert_eq!(classify(""), Affirmation::Unclear);
        assert_eq!(classify("うーん"), Affirmation::Unclear);
        assert_eq!(classify("maybe"), Affirmation::Unclear);
    }
}
