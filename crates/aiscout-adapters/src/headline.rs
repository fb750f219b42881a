//! Headline-aggregator adapter (spec.md §4.G).
//!
//! Fetches ranked id-lists (e.g. `top`, `new`, `best`), interleaves them
//! tagged with their `story_kind`, and fans out bounded-concurrency
//! item-detail requests.

use crate::record::{RawRecord, SourceType};
use aiscout_config::{CommonFields, HeadlineOpts};
use aiscout_http::HttpClient;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";
const MAX_FANOUT: usize = 20;
const IDS_PER_LIST: usize = 100;

fn default_story_kinds() -> Vec<(&'static str, &'static str)> {
    vec![
        ("topstories", "top"),
        ("newstories", "new"),
        ("beststories", "best"),
    ]
}

pub async fn fetch(http: &HttpClient, common: &CommonFields, opts: &HeadlineOpts) -> Vec<RawRecord> {
    let base_url = common
        .api_base_url
        .clone()
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let kinds: Vec<(&str, &str)> = if opts.selectors.is_empty() {
        default_story_kinds()
    } else {
        default_story_kinds()
            .into_iter()
            .filter(|(_, short)| opts.selectors.iter().any(|s| s == short))
            .collect()
    };

    let mut ordered_ids: Vec<(i64, &str)> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (endpoint, kind) in &kinds {
        let url = format!("{base_url}/{endpoint}.json");
        match http.get(&url, &[], &[]).await {
            Ok(response) => match response.json::<Vec<i64>>().await {
                Ok(ids) => {
                    for id in ids.into_iter().take(IDS_PER_LIST) {
                        if seen.insert(id) {
                            ordered_ids.push((id, kind));
                        }
                    }
                }
                Err(e) => warn!(endpoint, error = %e, "failed to parse id list"),
            },
            Err(e) => warn!(endpoint, error = %e, "failed to fetch id list"),
        }
    }

    if ordered_ids.is_empty() {
        return Vec::new();
    }

    let limit = common.fetch_limit.max(1);
    let candidates: Vec<(i64, &str)> = ordered_ids.into_iter().take(limit * 3).collect();

    let records: Vec<Option<RawRecord>> = stream::iter(candidates)
        .map(|(id, kind)| fetch_item(http, &base_url, id, kind))
        .buffer_unordered(MAX_FANOUT)
        .collect()
        .await;

    let mut out: Vec<RawRecord> = records.into_iter().flatten().collect();
    out.truncate(limit);
    out
}

async fn fetch_item(http: &HttpClient, base_url: &str, id: i64, kind: &str) -> Option<RawRecord> {
    let url = format!("{base_url}/item/{id}.json");
    let response = http.get(&url, &[], &[]).await.ok()?;
    let story: Value = response.json().await.ok()?;

    if story.get("type").and_then(Value::as_str) != Some("story") {
        return None;
    }

    let title = story.get("title").and_then(Value::as_str)?.to_string();
    let item_page = format!("https://news.ycombinator.com/item?id={id}");
    let url = story
        .get("url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or(item_page);

    let published_at = story
        .get("time")
        .and_then(Value::as_i64)
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0));

    Some(RawRecord {
        upstream_id: id.to_string(),
        source_type: SourceType::Headline,
        title,
        raw_summary: story
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        url,
        published_at,
        author: story.get("by").and_then(Value::as_str).map(str::to_string),
        score: story.get("score").and_then(Value::as_i64),
        tags: Vec::new(),
        lang_hint: None,
        story_kind: Some(kind.to_string()),
        extra: story
            .get("descendants")
            .and_then(Value::as_i64)
            .map(|n| {
                let mut map = serde_json::Map::new();
                map.insert("comments_count".to_string(), Value::from(n));
                map
            })
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetches_and_interleaves_story_kinds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/topstories.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![1]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/newstories.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![2]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/beststories.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<i64>::new()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/item/1.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 1, "type": "story", "title": "GPT-5 news", "by": "alice",
                "score": 120, "time": 1_700_000_000, "url": "https://example.com/a"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/item/2.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 2, "type": "story", "title": "New SQL engine", "by": "bob", "score": 50
            })))
            .mount(&server)
            .await;

        let http = HttpClient::new("aiscout-test/0.1").unwrap();
        let common = CommonFields {
            api_base_url: Some(server.uri()),
            fetch_limit: 10,
            ..Default::default()
        };
        let records = fetch(&http, &common, &HeadlineOpts::default()).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].story_kind.as_deref(), Some("top"));
        assert_eq!(records[1].url, "https://news.ycombinator.com/item?id=2");
    }
}
