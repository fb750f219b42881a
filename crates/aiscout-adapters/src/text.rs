//! Summary cleanup shared by every adapter: HTML stripping, whitespace
//! normalization, and word-boundary clipping.

pub fn strip_html(input: &str) -> String {
    if !input.contains('<') {
        return input.to_string();
    }
    let fragment = scraper::Html::parse_fragment(input);
    fragment.root_element().text().collect::<Vec<_>>().join(" ")
}

pub fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

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

pub fn clean_summary(raw: &str, limit: usize) -> String {
    clip_at_word_boundary(&normalize_whitespace(&strip_html(raw)), limit)
}
