//! Code-host search adapter (spec.md §4.G).
//!
//! Cartesian product of `{trending_kind} x {language}` queries against a
//! GitHub-shaped code-search API. A 403 (rate limit) breaks out of the
//! inner language loop but the outer kind loop continues.

use crate::record::{RawRecord, SourceType};
use aiscout_config::{CommonFields, RepoOpts};
use aiscout_http::HttpClient;
use aiscout_utils::error::TransportError;
use aiscout_utils::time::now;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const DEFAULT_STAR_FLOOR: u64 = 100;

fn default_kinds() -> &'static [&'static str] {
    &["pushed", "created", "stars"]
}

fn default_languages() -> &'static [&'static str] {
    &["python", "javascript", "typescript", "rust"]
}

struct Query {
    query: String,
    sort: &'static str,
}

fn build_query(kind: &str, language: &str, keywords: &[String], star_floor: u64) -> Query {
    let mut parts = vec![format!("language:{language}")];
    for kw in keywords {
        parts.push(kw.clone());
    }
    if keywords.is_empty() {
        parts.push("ai".to_string());
    }

    let sort = match kind {
        "pushed" => {
            let since = (now() - Duration::days(7)).format("%Y-%m-%d");
            parts.push(format!("pushed:>={since}"));
            parts.push(format!("stars:>{star_floor}"));
            "updated"
        }
        "created" => {
            let since = (now() - Duration::days(180)).format("%Y-%m-%d");
            parts.push(format!("created:>={since}"));
            parts.push(format!("stars:>{star_floor}"));
            "stars"
        }
        _ => {
            let since = (now() - Duration::days(180)).format("%Y-%m-%d");
            parts.push(format!("created:>={since}"));
            parts.push(format!("stars:>{star_floor}"));
            "stars"
        }
    };

    Query {
        query: parts.join(" "),
        sort,
    }
}

pub async fn fetch(http: &HttpClient, common: &CommonFields, opts: &RepoOpts) -> Vec<RawRecord> {
    let base_url = common
        .api_base_url
        .clone()
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let per_page = common.fetch_limit.clamp(1, 100).to_string();

    let kinds: Vec<String> = if opts.trending_types.is_empty() {
        default_kinds().iter().map(|s| s.to_string()).collect()
    } else {
        opts.trending_types.clone()
    };
    let languages: Vec<String> = if opts.languages.is_empty() {
        default_languages().iter().map(|s| s.to_string()).collect()
    } else {
        opts.languages.clone()
    };

    let mut records = Vec::new();

    for kind in &kinds {
        let star_floor = opts
            .star_limits
            .get(kind)
            .copied()
            .unwrap_or(DEFAULT_STAR_FLOOR);

        for language in &languages {
            let built = build_query(kind, language, &opts.query_keywords, star_floor);
            let url = format!("{base_url}/search/repositories");
            let params = [
                ("q", built.query.as_str()),
                ("sort", built.sort),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ];

            match http.get(&url, &[], &params).await {
                Ok(response) => match response.json::<Value>().await {
                    Ok(data) => {
                        if let Some(items) = data.get("items").and_then(Value::as_array) {
                            for item in items {
                                if let Some(record) = to_record(item, kind) {
                                    records.push(record);
                                }
                            }
                        }
                    }
                    Err(e) => warn!(kind, language, error = %e, "failed to parse search response"),
                },
                Err(TransportError::Transport { status: Some(403), .. }) => {
                    warn!(kind, language, "rate limited, skipping remaining languages for this kind");
                    break;
                }
                Err(e) => {
                    warn!(kind, language, error = %e, "repo search request failed");
                }
            }
        }
    }

    records
}

fn to_record(item: &Value, kind: &str) -> Option<RawRecord> {
    let full_name = item.get("full_name").and_then(Value::as_str)?.to_string();
    let url = item.get("html_url").and_then(Value::as_str)?.to_string();

    let published_at = item
        .get("pushed_at")
        .or_else(|| item.get("created_at"))
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let topics: Vec<String> = item
        .get("topics")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut extra = serde_json::Map::new();
    extra.insert("full_name".to_string(), Value::from(full_name.clone()));
    extra.insert("topics".to_string(), Value::from(topics.clone()));

    Some(RawRecord {
        upstream_id: full_name.clone(),
        source_type: SourceType::Repo,
        title: full_name,
        raw_summary: item
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        url,
        published_at,
        author: item
            .get("owner")
            .and_then(|o| o.get("login"))
            .and_then(Value::as_str)
            .map(str::to_string),
        score: item.get("stargazers_count").and_then(Value::as_i64),
        tags: topics,
        lang_hint: item
            .get("language")
            .and_then(Value::as_str)
            .map(str::to_string),
        story_kind: Some(kind.to_string()),
        extra,
    })
}
