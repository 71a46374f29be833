//! Title normalization for duplicate matching.

/// Normalize an event title for exact duplicate comparison: case-folded,
/// with all whitespace (half- and full-width) and ASCII punctuation
/// removed.
pub fn normalize_title(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_ascii_punctuation())
        .collect()
}
