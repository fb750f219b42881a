//! [`NormalizedItem`], the pipeline's output shape (spec.md §3).

use aiscout_adapters::SourceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse content kind, derived heuristically from `source_type` and
/// `story_kind` during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleTag {
    News,
    Tool,
    Paper,
    Blog,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedItem {
    pub title: String,
    /// Invariant: `summary.chars().count() <= 300`.
    pub summary: String,
    pub url: String,
    pub source_type: SourceType,
    pub article_tag: ArticleTag,
    pub published_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub score: Option<i64>,
    pub comments_count: Option<i64>,
    /// Invariant: at most 5 entries.
    #[serde(default)]
    pub tags: Vec<String>,
    pub story_kind: Option<String>,
    /// Absent iff the item was never scored (e.g. a translation-only path).
    pub ai_score: Option<f64>,
}

impl NormalizedItem {
    /// The key the sink dedupes on: `feed` sources merge by `url` (the
    /// item `link`); every other source also keys by `url` since upstream
    /// ids there are not guaranteed globally unique across re-fetches.
    pub fn dedup_key(&self) -> &str {
        &self.url
    }
}
