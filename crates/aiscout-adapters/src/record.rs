//! [`RawRecord`], the common adapter output shape (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Headline,
    Repo,
    Paper,
    Feed,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Headline => "headline",
            SourceType::Repo => "repo",
            SourceType::Paper => "paper",
            SourceType::Feed => "feed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub upstream_id: String,
    pub source_type: SourceType,
    pub title: String,
    pub raw_summary: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub score: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub lang_hint: Option<String>,
    pub story_kind: Option<String>,
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
