//! Paper-index adapter (spec.md §4.G), grounded on the arXiv Atom API.

use crate::record::{RawRecord, SourceType};
use crate::text::clip_at_word_boundary;
use aiscout_config::{CommonFields, PaperOpts};
use aiscout_http::HttpClient;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashSet;
use tracing::warn;

const DEFAULT_BASE_URL: &str = "http://export.arxiv.org/api/query";
const SUMMARY_CLIP: usize = 500;
const AUTHOR_LIMIT: usize = 5;
const MAX_CONCURRENT_CATEGORIES: usize = 5;
const DEFAULT_CATEGORY: &str = "cs.AI";

#[derive(Debug, Default, Clone)]
struct Entry {
    id: String,
    title: String,
    summary: String,
    published: String,
    primary_category: String,
    categories: Vec<String>,
    authors: Vec<String>,
}

pub async fn fetch(http: &HttpClient, common: &CommonFields, opts: &PaperOpts) -> Vec<RawRecord> {
    let base_url = common
        .api_base_url
        .clone()
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let categories: Vec<String> = if opts.categories.is_empty() {
        vec![DEFAULT_CATEGORY.to_string()]
    } else {
        opts.categories.clone()
    };

    let results: Vec<Vec<RawRecord>> = stream::iter(categories)
        .map(|category| fetch_category(http, &base_url, common, opts, category))
        .buffer_unordered(MAX_CONCURRENT_CATEGORIES)
        .collect()
        .await;

    let mut seen = HashSet::new();
    results
        .into_iter()
        .flatten()
        .filter(|record| seen.insert(record.upstream_id.clone()))
        .collect()
}

async fn fetch_category(
    http: &HttpClient,
    base_url: &str,
    common: &CommonFields,
    opts: &PaperOpts,
    category: String,
) -> Vec<RawRecord> {
    let mut search_query = format!("cat:{category}");
    if !opts.keywords.is_empty() {
        search_query = format!("{search_query} AND ({})", opts.keywords.join(" OR "));
    }

    let max_results = common.fetch_limit.max(1).to_string();
    let params = [
        ("search_query", search_query.as_str()),
        ("sortBy", "submittedDate"),
        ("sortOrder", "descending"),
        ("max_results", max_results.as_str()),
    ];

    let response = match http.get(base_url, &[], &params).await {
        Ok(r) => r,
        Err(e) => {
            warn!(category, error = %e, "arxiv request failed");
            return Vec::new();
        }
    };

    let body = match response.text().await {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "failed to read arxiv response body");
            return Vec::new();
        }
    };

    parse_feed(&body)
        .into_iter()
        .map(|entry| to_record(entry, &category))
        .collect()
}

fn parse_feed(xml: &str) -> Vec<Entry> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<Entry> = None;
    let mut in_entry = false;
    let mut text_buffer = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "entry" {
                    in_entry = true;
                    current = Some(Entry::default());
                } else if name == "category" && in_entry {
                    let mut term = None;
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"term" {
                            term = Some(String::from_utf8_lossy(&attr.value).to_string());
                        }
                    }
                    if let (Some(term), Some(entry)) = (term, current.as_mut()) {
                        if entry.primary_category.is_empty() {
                            entry.primary_category = term.clone();
                        }
                        entry.categories.push(term);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                text_buffer = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "entry" {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                    in_entry = false;
                } else if in_entry {
                    if let Some(entry) = current.as_mut() {
                        match name.as_str() {
                            "id" => entry.id = text_buffer.clone(),
                            "title" => entry.title = text_buffer.clone(),
                            "summary" => entry.summary = text_buffer.clone(),
                            "published" => entry.published = text_buffer.clone(),
                            "name" => entry.authors.push(text_buffer.clone()),
                            _ => {}
                        }
                    }
                }
                text_buffer.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(error = %e, "arxiv feed parse error, returning entries found so far");
                break;
            }
            _ => {}
        }
    }

    entries
}

fn to_record(entry: Entry, category: &str) -> RawRecord {
    let total_authors = entry.authors.len();
    let authors: Vec<String> = entry.authors.into_iter().take(AUTHOR_LIMIT).collect();
    let published_at = DateTime::parse_from_rfc3339(&entry.published)
        .ok()
        .map(|dt| dt.with_timezone(&Utc));

    let mut extra = serde_json::Map::new();
    extra.insert("authors".to_string(), serde_json::Value::from(authors.clone()));
    extra.insert("author_count".to_string(), serde_json::Value::from(total_authors));
    extra.insert(
        "primary_category".to_string(),
        serde_json::Value::from(entry.primary_category.clone()),
    );

    RawRecord {
        upstream_id: entry.id.clone(),
        source_type: SourceType::Paper,
        title: entry.title.split_whitespace().collect::<Vec<_>>().join(" "),
        raw_summary: clip_at_word_boundary(entry.summary.trim(), SUMMARY_CLIP),
        url: entry.id,
        published_at,
        author: authors.first().cloned(),
        score: None,
        tags: entry.categories,
        lang_hint: None,
        story_kind: Some(category.to_string()),
        extra,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/2601.00001v1</id>
    <title>A New Transformer Variant</title>
    <summary>We propose a new transformer architecture.</summary>
    <published>2026-07-01T00:00:00Z</published>
    <author><name>Alice Smith</name></author>
    <author><name>Bob Jones</name></author>
    <category term="cs.AI"/>
    <category term="cs.LG"/>
  </entry>
</feed>"#;

    #[test]
    fn parses_entry_with_authors_and_categories() {
        let entries = parse_feed(SAMPLE_FEED);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].authors, vec!["Alice Smith", "Bob Jones"]);
        assert_eq!(entries[0].primary_category, "cs.AI");
        assert_eq!(entries[0].categories, vec!["cs.AI", "cs.LG"]);
    }

    #[test]
    fn to_record_clips_summary_and_caps_authors() {
        let mut entry = parse_feed(SAMPLE_FEED).remove(0);
        entry.authors = (0..10).map(|i| format!("Author {i}")).collect();
        let record = to_record(entry, "cs.AI");
        assert_eq!(record.extra.get("author_count").unwrap(), &serde_json::Value::from(10));
    }

    #[tokio::test]
    async fn fetches_multiple_categories_concurrently_and_dedupes() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_FEED))
            .mount(&server)
            .await;

        let http = HttpClient::new("aiscout-test/0.1").unwrap();
        let common = CommonFields {
            api_base_url: Some(server.uri()),
            fetch_limit: 5,
            ..Default::default()
        };
        let opts = PaperOpts {
            categories: vec!["cs.AI".to_string(), "cs.LG".to_string()],
            keywords: vec![],
        };

        let records = fetch(&http, &common, &opts).await;
        // Both categories return the same entry id; dedup keeps just one.
        assert_eq!(records.len(), 1);
    }
}
