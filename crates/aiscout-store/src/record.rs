//! [`ProjectRecord`] and its status lifecycle (spec.md §3, §4.F).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `crawled < ai_screened < whitelisted`. `Expired` is terminal-for-whitelist
/// and is demoted to `Crawled` when comparing against an incoming status
/// (spec.md §4.F step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Crawled,
    AiScreened,
    Whitelisted,
    Expired,
}

impl Status {
    /// Rank used for the monotonic-upgrade comparison. `Expired` ranks as
    /// `Crawled` here so an incoming `ai_screened`/`whitelisted` can promote
    /// an expired record again.
    fn rank(self) -> u8 {
        match self {
            Status::Crawled | Status::Expired => 0,
            Status::AiScreened => 1,
            Status::Whitelisted => 2,
        }
    }

    pub fn max_for_upsert(self, incoming: Status) -> Status {
        if incoming.rank() >= self.rank() {
            incoming
        } else {
            self
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectRecord {
    pub upstream_id: String,
    pub full_name: Option<String>,
    pub title: String,
    pub summary: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub status: Status,
    #[serde(default)]
    pub ai_score: f32,
    pub ai_reason: Option<String>,
    pub crawled_at: DateTime<Utc>,
    pub last_screened_at: Option<DateTime<Utc>>,
    pub last_seen: DateTime<Utc>,
    pub whitelisted_until: Option<DateTime<Utc>>,
    pub language: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
    /// Origin-kind used by `statistics()`'s by-origin breakdown (e.g.
    /// `"headline"`, `"repo"`, `"paper"`, `"feed"`).
    #[serde(default)]
    pub origin_kind: String,
}

impl ProjectRecord {
    /// Fold legacy field layouts into the current shape. Pure and
    /// deterministic, run once on every load (spec.md §4.F "normalization
    /// step").
    pub fn normalize(mut self) -> Self {
        if self.status == Status::Whitelisted && self.whitelisted_until.is_none() {
            self.status = Status::AiScreened;
        }
        if self.ai_score.is_nan() {
            self.ai_score = 0.0;
        }
        self.ai_score = self.ai_score.clamp(0.0, 1.0);
        self
    }
}

pub type RecordMap = BTreeMap<String, ProjectRecord>;
