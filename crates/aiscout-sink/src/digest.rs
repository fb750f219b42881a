//! Markdown digest rendering for a sink document (supplementing spec.md:
//! the distillation dropped the human-readable digest view the original
//! pipeline produced alongside its JSON output).

use crate::sink::SinkDocument;
use std::fmt::Write as _;

/// Renders one `(source, day)` document as a Markdown report: a heading,
/// an item count, and one section per item with its known fields.
pub fn render_markdown(day: &str, doc: &SinkDocument) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {} — {day}", title_case(&doc.source));
    if let Some(updated_at) = doc.updated_at {
        let _ = writeln!(out, "\n**Updated**: {}", updated_at.format("%Y-%m-%d %H:%M UTC"));
    }
    let _ = writeln!(out, "\n**Total**: {} items\n", doc.total_count);
    out.push_str("---\n\n");

    for (idx, item) in doc.items.iter().enumerate() {
        let _ = writeln!(out, "## {}. {}\n", idx + 1, item.title);

        if !item.summary.is_empty() {
            let _ = writeln!(out, "**Summary**: {}\n", item.summary);
        }
        if let Some(author) = &item.author {
            let _ = writeln!(out, "**Author**: {author}\n");
        }
        if let Some(score) = item.score {
            let _ = writeln!(out, "**Score**: {score}\n");
        }
        if let Some(published_at) = item.published_at {
            let _ = writeln!(out, "**Published**: {}\n", published_at.format("%Y-%m-%d"));
        }
        let _ = writeln!(out, "**Link**: [{0}]({0})\n", item.url);
        if !item.tags.is_empty() {
            let tags = item
                .tags
                .iter()
                .map(|t| format!("`{t}`"))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "**Tags**: {tags}\n");
        }
        if let Some(ai_score) = item.ai_score {
            let _ = writeln!(out, "**AI relevance**: {ai_score:.2}\n");
        }
        out.push_str("---\n\n");
    }

    out
}

fn title_case(source: &str) -> String {
    let mut chars = source.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ArticleTag, NormalizedItem};
    use aiscout_adapters::SourceType;

    #[test]
    fn renders_heading_and_item_fields() {
        let doc = SinkDocument {
            source: "headline".to_string(),
            updated_at: None,
            total_count: 1,
            items: vec![NormalizedItem {
                title: "GPT-5 news".to_string(),
                summary: "A summary".to_string(),
                url: "https://example.com/a".to_string(),
                source_type: SourceType::Headline,
                article_tag: ArticleTag::News,
                published_at: None,
                author: Some("alice".to_string()),
                score: Some(120),
                comments_count: None,
                tags: vec!["ai".to_string()],
                story_kind: None,
                ai_score: Some(0.87),
            }],
        };

        let md = render_markdown("2026-07-27", &doc);
        assert!(md.contains("# Headline"));
        assert!(md.contains("## 1. GPT-5 news"));
        assert!(md.contains("**Author**: alice"));
        assert!(md.contains("**AI relevance**: 0.87"));
    }

    #[test]
    fn empty_document_still_renders_heading() {
        let doc = SinkDocument {
            source: "paper".to_string(),
            ..Default::default()
        };
        let md = render_markdown("2026-07-27", &doc);
        assert!(md.contains("**Total**: 0 items"));
    }
}
