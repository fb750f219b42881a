//! Global, scheduler, and LLM configuration sections (spec.md §6).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_cache_ttl() -> u64 {
    1800
}
fn default_request_timeout() -> u64 {
    60
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; aiscout/0.1; +https://example.com/bot)".to_string()
}

/// `[global_settings]`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalSettings {
    pub default_cache_ttl: u64,
    pub request_timeout: u64,
    pub user_agent: String,
    /// Hostnames (or substrings thereof) that get a single enriched-header
    /// retry on a 403 (spec.md §4.C).
    pub anti_bot_hosts: Vec<String>,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            default_cache_ttl: default_cache_ttl(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            anti_bot_hosts: Vec::new(),
        }
    }
}

/// `[global_settings.scheduler]`
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub tasks: BTreeMap<String, TaskSchedule>,
}

/// One entry of `global_settings.scheduler.tasks.<source>`.
///
/// `time` accepts either a single `"HH:MM"` string or a list in the TOML
/// source; both normalize to `Vec<String>` here.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TaskSchedule {
    pub enabled: bool,
    #[serde(deserialize_with = "list_or_scalar::one_or_many")]
    pub time: Vec<String>,
    pub max_results: usize,
}

/// `[llm]`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: String,
    pub api_key: String,
    pub api_url: String,
    pub model_name: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Temporal filter window (spec.md §4.H step 4).
    pub recent_days: i64,
    /// Language the translator targets (spec.md §4.E). The original
    /// translates into Chinese, which is what makes "already contains a
    /// CJK code point" a valid already-translated shortcut.
    #[serde(default = "default_target_language")]
    pub target_language: String,
}

fn default_target_language() -> String {
    "zh".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: String::new(),
            api_key: String::new(),
            api_url: String::new(),
            model_name: String::new(),
            max_tokens: 1024,
            temperature: 0.3,
            recent_days: 7,
            target_language: default_target_language(),
        }
    }
}

// `one_or_many` is shared with sources.rs's list-valued fields.
pub(crate) mod list_or_scalar {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    pub fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(s) => Ok(vec![s]),
            OneOrMany::Many(v) => Ok(v),
        }
    }
}
