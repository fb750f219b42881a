//! Robust extraction of `[{id, score, keep, reason}, ...]` from LLM output
//! that may be wrapped in markdown fences, truncated mid-array, or
//! otherwise malformed (spec.md §4.D "Robust parsing").

use crate::Verdict;
use serde_json::Value;

fn strip_markdown_fence(content: &str) -> &str {
    let trimmed = content.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        if let Some(end) = rest.find("```") {
            return rest[..end].trim();
        }
    }
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(end) = rest.find("```") {
            return rest[..end].trim();
        }
    }
    trimmed
}

fn verdict_from_value(value: &Value) -> Option<Verdict> {
    let obj = value.as_object()?;
    let id = obj.get("id")?.as_str().map(str::to_string).or_else(|| {
        obj.get("id").and_then(Value::as_i64).map(|n| n.to_string())
    })?;
    Some(Verdict {
        id,
        score: obj.get("score").and_then(Value::as_f64).unwrap_or(0.5) as f32,
        keep: obj.get("keep").and_then(Value::as_bool).unwrap_or(true),
        reason: obj
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// Close a JSON array that was truncated mid-object: find the last
/// well-formed closing `}` and discard anything after it.
fn close_truncated_array(content: &str) -> Option<String> {
    if content.trim_end().ends_with(']') {
        return None;
    }
    let last_brace = content.rfind('}')?;
    let before = &content[..=last_brace];
    let opens = before.matches('{').count();
    let closes = before.matches('}').count();
    if opens > closes {
        return None;
    }
    Some(format!("{before}\n]"))
}

/// Scan for balanced `{...}` objects regardless of surrounding syntax
/// errors, used once strict parsing (even after the truncation fix) fails.
fn extract_balanced_objects(content: &str) -> Vec<Value> {
    let mut out = Vec::new();
    let bytes = content.as_bytes();
    let mut depth = 0i32;
    let mut start = None;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        if let Ok(v) = serde_json::from_str::<Value>(&content[s..=i]) {
                            out.push(v);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    out
}

/// Parse one LLM response body into verdicts for exactly `expected_ids`,
/// filling any id that could not be recovered with the default-kept
/// verdict.
pub fn parse_verdicts(content: &str, expected_ids: &[String]) -> Vec<Verdict> {
    let stripped = strip_markdown_fence(content);

    let parsed: Option<Vec<Value>> = serde_json::from_str::<Vec<Value>>(stripped)
        .ok()
        .or_else(|| {
            close_truncated_array(stripped).and_then(|fixed| serde_json::from_str(&fixed).ok())
        });

    let values = parsed.unwrap_or_else(|| extract_balanced_objects(stripped));

    let mut by_id = std::collections::HashMap::new();
    for v in &values {
        if let Some(verdict) = verdict_from_value(v) {
            by_id.insert(verdict.id.clone(), verdict);
        }
    }

    expected_ids
        .iter()
        .map(|id| {
            by_id
                .remove(id)
                .unwrap_or_else(|| Verdict::default_kept(id.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json_array() {
        let content = r#"[{"id":"1","score":0.9,"keep":true,"reason":"gpt"}]"#;
        let verdicts = parse_verdicts(content, &["1".to_string()]);
        assert_eq!(verdicts.len(), 1);
        assert!(verdicts[0].keep);
        assert_eq!(verdicts[0].score, 0.9);
    }

    #[test]
    fn strips_markdown_fence() {
        let content = "```json\n[{\"id\":\"1\",\"score\":0.2,\"keep\":false,\"reason\":\"db\"}]\n```";
        let verdicts = parse_verdicts(content, &["1".to_string()]);
        assert!(!verdicts[0].keep);
    }

    #[test]
    fn recovers_truncated_array() {
        let content = r#"[{"id":"1","score":0.9,"keep":true,"reason":"gpt"},{"id":"2","score":0.1"#;
        let verdicts = parse_verdicts(content, &["1".to_string(), "2".to_string()]);
        assert_eq!(verdicts.len(), 2);
        assert!(verdicts[0].keep);
        // id 2 could not be recovered, falls back to default-kept
        assert!(verdicts[1].keep);
        assert_eq!(verdicts[1].reason, "default-kept");
    }

    #[test]
    fn missing_ids_fill_with_default_kept() {
        let content = r#"[{"id":"1","score":0.9,"keep":true,"reason":"gpt"}]"#;
        let verdicts = parse_verdicts(content, &["1".to_string(), "2".to_string()]);
        assert_eq!(verdicts.len(), 2);
        assert_eq!(verdicts[1].id, "2");
        assert!(verdicts[1].keep);
    }

    #[test]
    fn garbage_input_falls_back_entirely() {
        let verdicts = parse_verdicts("not json at all", &["1".to_string()]);
        assert_eq!(verdicts.len(), 1);
        assert!(verdicts[0].keep);
    }
}
