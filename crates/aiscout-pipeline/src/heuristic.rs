//! `article_tag` heuristic (spec.md §4.H step 8): classifies a normalized
//! item into `{news, tool, paper, blog}` from its source type and tags.
//! Left unspecified by the distilled spec beyond "a heuristic on
//! `(title, summary, source_type, tags)`"; resolved here (see DESIGN.md).

use aiscout_adapters::SourceType;
use aiscout_sink::ArticleTag;

pub fn classify(source_type: SourceType, tags: &[String]) -> ArticleTag {
    match source_type {
        SourceType::Paper => ArticleTag::Paper,
        SourceType::Repo => ArticleTag::Tool,
        SourceType::Headline => ArticleTag::News,
        SourceType::Feed => {
            if tags.iter().any(|t| t.eq_ignore_ascii_case("news")) {
                ArticleTag::News
            } else {
                ArticleTag::Blog
            }
        }
    }
}
