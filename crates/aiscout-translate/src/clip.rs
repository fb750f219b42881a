//! Code-point clipping helpers (spec.md §4.E "Pre-clipping").

/// True if `s` contains any code point in the CJK Unified Ideographs block
/// (U+4E00-U+9FFF) — the language-detection heuristic the translator uses
/// to short-circuit already-translated text.
pub fn has_cjk(s: &str) -> bool {
    s.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

/// Clip to at most `limit` code points, trimming back to the nearest
/// preceding word boundary (ASCII whitespace) and appending `...` when the
/// input was actually truncated.
pub fn clip_at_word_boundary(s: &str, limit: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= limit {
        return s.to_string();
    }
    let mut cut = limit;
    while cut > 0 && !chars[cut - 1].is_whitespace() {
        cut -= 1;
    }
    if cut == 0 {
        cut = limit;
    }
    let clipped: String = chars[..cut].iter().collect();
    format!("{}...", clipped.trim_end())
}

/// Hard clip to at most `limit` code points, no boundary search — used for
/// the post-translation re-clip where token cost is no longer a concern.
/// A truncated result carries a trailing `...` that counts toward `limit`,
/// so the returned string never exceeds it.
pub fn clip_code_points(s: &str, limit: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= limit {
        return s.to_string();
    }
    let keep = limit.saturating_sub(3);
    let clipped: String = chars[..keep].iter().collect();
    format!("{clipped}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cjk() {
        assert!(has_cjk("你好世界"));
        assert!(has_cjk("mixed 中文 text"));
        assert!(!has_cjk("plain english"));
    }

    #[test]
    fn clips_at_word_boundary() {
        let s = "a ".repeat(200);
        let clipped = clip_at_word_boundary(&s, 10);
        assert!(clipped.ends_with("..."));
        assert!(clipped.chars().count() <= 13);
    }

    #[test]
    fn short_string_unclipped() {
        assert_eq!(clip_at_word_boundary("hello", 350), "hello");
    }

    #[test]
    fn hard_clip_truncates_with_ellipsis() {
        let s = "x".repeat(400);
        let clipped = clip_code_points(&s, 300);
        assert_eq!(clipped.chars().count(), 300);
        assert!(clipped.ends_with("..."));
    }
}
