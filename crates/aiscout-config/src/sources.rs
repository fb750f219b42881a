//! Per-source configuration (spec.md §6, `sources.<source>.<key>`).
//!
//! The source's shape in the source language was a single dict with
//! multiple-inheritance-style mixins; this reshapes it as composition
//! (spec.md §9 design note): [`CommonFields`] plus exactly one
//! variant-specific payload.

use crate::model::list_or_scalar::one_or_many;
use aiscout_utils::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_fetch_limit() -> usize {
    30
}

/// Fields every source shares, regardless of kind.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CommonFields {
    pub enabled: bool,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub api_base_url: Option<String>,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    pub cache_ttl: Option<u64>,
    pub ai_filter_enabled: bool,
    pub translation_enabled: bool,
    pub recent_days: Option<i64>,
}

impl Default for CommonFields {
    fn default() -> Self {
        Self {
            enabled: true,
            name: None,
            description: None,
            url: None,
            api_base_url: None,
            fetch_limit: default_fetch_limit(),
            cache_ttl: None,
            ai_filter_enabled: true,
            translation_enabled: true,
            recent_days: None,
        }
    }
}

/// Headline-aggregator-specific knobs (`story_kind` lists to poll).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HeadlineOpts {
    #[serde(deserialize_with = "one_or_many")]
    pub selectors: Vec<String>,
}

/// Code-host search knobs.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RepoOpts {
    #[serde(deserialize_with = "one_or_many")]
    pub languages: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub trending_types: Vec<String>,
    pub star_limits: BTreeMap<String, u64>,
    #[serde(deserialize_with = "one_or_many")]
    pub query_keywords: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub topics: Vec<String>,
}

/// Paper-index knobs. `category` accepts either a single key or a list
/// (the original config enabled several arXiv categories at once, fanned
/// out concurrently — spec.md §5's "paper adapter caps concurrent
/// category fetches at 5").
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PaperOpts {
    #[serde(alias = "category", deserialize_with = "one_or_many")]
    pub categories: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub keywords: Vec<String>,
}

/// Syndication-feed knobs.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FeedOpts {
    #[serde(deserialize_with = "one_or_many")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceVariant {
    Headline(HeadlineOpts),
    Repo(RepoOpts),
    Paper(PaperOpts),
    Feed(FeedOpts),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub key: String,
    pub common: CommonFields,
    pub variant: SourceVariant,
}

/// Infer the variant from a source's configuration key, matching the four
/// adapter shapes in spec.md §4.G. An explicit `source_type` key overrides
/// the name-based guess.
fn variant_kind(key: &str, table: &toml::Value) -> Result<&'static str, ConfigError> {
    if let Some(explicit) = table.get("source_type").and_then(|v| v.as_str()) {
        return match explicit {
            "headline" | "repo" | "paper" | "feed" => Ok(match explicit {
                "headline" => "headline",
                "repo" => "repo",
                "paper" => "paper",
                _ => "feed",
            }),
            other => Err(ConfigError::Invalid(format!(
                "sources.{key}: unknown source_type '{other}'"
            ))),
        };
    }
    match key {
        "headline" | "hackernews" | "hn" => Ok("headline"),
        "repo" | "github" | "code_host" => Ok("repo"),
        "paper" | "arxiv" => Ok("paper"),
        "feed" | "rss" => Ok("feed"),
        other => Err(ConfigError::Invalid(format!(
            "sources.{other}: cannot infer source kind; set source_type explicitly"
        ))),
    }
}

pub(crate) fn parse_sources(
    raw: &toml::Value,
) -> Result<BTreeMap<String, SourceConfig>, ConfigError> {
    let mut out = BTreeMap::new();
    let Some(table) = raw.get("sources").and_then(|v| v.as_table()) else {
        return Ok(out);
    };

    for (key, value) in table {
        let common = CommonFields::deserialize(value.clone())
            .map_err(|e| ConfigError::Invalid(format!("sources.{key}: {e}")))?;

        let kind = variant_kind(key, value)?;
        let variant = match kind {
            "headline" => SourceVariant::Headline(
                HeadlineOpts::deserialize(value.clone())
                    .map_err(|e| ConfigError::Invalid(format!("sources.{key}: {e}")))?,
            ),
            "repo" => SourceVariant::Repo(
                RepoOpts::deserialize(value.clone())
                    .map_err(|e| ConfigError::Invalid(format!("sources.{key}: {e}")))?,
            ),
            "paper" => SourceVariant::Paper(
                PaperOpts::deserialize(value.clone())
                    .map_err(|e| ConfigError::Invalid(format!("sources.{key}: {e}")))?,
            ),
            _ => SourceVariant::Feed(
                FeedOpts::deserialize(value.clone())
                    .map_err(|e| ConfigError::Invalid(format!("sources.{key}: {e}")))?,
            ),
        };

        out.insert(
            key.clone(),
            SourceConfig {
                key: key.clone(),
                common,
                variant,
            },
        );
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_repo_opts_for_github_source() {
        let raw: toml::Value = toml::from_str(
            r#"
            [sources.repo]
            enabled = true
            languages = ["rust", "python"]
            trending_types = "stars"
            star_limits = { stars = 50 }
            "#,
        )
        .unwrap();
        let sources = parse_sources(&raw).unwrap();
        let repo = sources.get("repo").unwrap();
        match &repo.variant {
            SourceVariant::Repo(opts) => {
                assert_eq!(opts.languages, vec!["rust", "python"]);
                assert_eq!(opts.trending_types, vec!["stars"]);
                assert_eq!(opts.star_limits.get("stars"), Some(&50));
            }
            other => panic!("expected Repo variant, got {other:?}"),
        }
    }

    #[test]
    fn unknown_source_key_without_explicit_type_errors() {
        let raw: toml::Value = toml::from_str("[sources.mystery]\nenabled = true\n").unwrap();
        assert!(parse_sources(&raw).is_err());
    }
}
