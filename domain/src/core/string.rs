//! String utilities for the domain layer.

/// Truncate a string to a maximum byte length with ellipsis (UTF-8 safe).
///
/// Used when earlier statements are quoted back into prompts, so one verbose
/// persona cannot crowd out the rest of the history.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len.saturating_sub(3).min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Keep the first `max_chars` characters, appending "..." when anything was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Normalize free text into a comparison key.
///
/// Lower-cases, strips punctuation and collapses whitespace, so that
/// "Hiring  pipeline is SLOW!" and "hiring pipeline is slow" compare equal.
pub fn normalize_key(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else if c.is_whitespace() {
                ' '
            } else {
                // punctuation joins words rather than splitting them ("on-boarding")
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_multibyte() {
        // each kana is 3 bytes; max 8 -> target 5 -> boundary at 3
        assert_eq!(truncate("あいうえお", 8), "あ...");
        assert_eq!(truncate("あいう", 9), "あいう");
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("あいう", 3), "あいう");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn test_normalize_key_collapses_case_and_punctuation() {
        assert_eq!(
            normalize_key("  Hiring  pipeline is SLOW! "),
            "hiring pipeline is slow"
        );
        assert_eq!(normalize_key("On-boarding: gaps."), "onboarding gaps");
    }

    #[test]
    fn test_normalize_key_keeps_non_latin_text() {
        assert_eq!(normalize_key("採用の 遅れ。"), "採用の 遅れ");
    }

    #[test]
    fn test_normalize_key_empty() {
        assert_eq!(normalize_key("!!!"), "");
    }
}
