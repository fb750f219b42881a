//! Syndication-feed adapter (spec.md §4.G).
//!
//! Parses RSS 2.0 (`<item>`) and Atom (`<entry>`) feeds leniently: a
//! malformed entry is skipped, not fatal to the whole feed.

use crate::record::{RawRecord, SourceType};
use crate::text::clean_summary;
use aiscout_config::{CommonFields, FeedOpts};
use aiscout_http::HttpClient;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::warn;

const SUMMARY_CLIP: usize = 500;

#[derive(Debug, Default, Clone)]
struct FeedItem {
    title: String,
    link: String,
    description: String,
    pub_date: String,
}

pub async fn fetch(http: &HttpClient, common: &CommonFields, opts: &FeedOpts) -> Vec<RawRecord> {
    let Some(url) = &common.url else {
        warn!("feed source has no url configured");
        return Vec::new();
    };

    let response = match http.get(url, &[], &[]).await {
        Ok(r) => r,
        Err(e) => {
            warn!(url, error = %e, "feed request failed");
            return Vec::new();
        }
    };

    let body = match response.text().await {
        Ok(b) => b,
        Err(e) => {
            warn!(url, error = %e, "failed to read feed body");
            return Vec::new();
        }
    };

    parse_items(&body)
        .into_iter()
        .filter_map(|item| to_record(item, opts))
        .take(common.fetch_limit.max(1))
        .collect()
}

fn parse_items(xml: &str) -> Vec<FeedItem> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<FeedItem> = None;
    let mut in_item = false;
    let mut text_buffer = String::new();
    let mut current_tag = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                current_tag = name.clone();
                if name == "item" || name == "entry" {
                    in_item = true;
                    current = Some(FeedItem::default());
                } else if name == "link" && in_item {
                    // Atom: <link href="..."/> as a self-closing or attributed start tag.
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"href" {
                            if let Some(item) = current.as_mut() {
                                if item.link.is_empty() {
                                    item.link = String::from_utf8_lossy(&attr.value).to_string();
                                }
                            }
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "link" && in_item {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"href" {
                            if let Some(item) = current.as_mut() {
                                if item.link.is_empty() {
                                    item.link = String::from_utf8_lossy(&attr.value).to_string();
                                }
                            }
                        }
                    }
                }
            }
            Ok(Event::Text(e)) | Ok(Event::CData(e)) => {
                text_buffer = e
                    .decode()
                    .map(|c| c.into_owned())
                    .or_else(|_| {
                        String::from_utf8(e.into_inner().into_owned()).map_err(|_| ())
                    })
                    .unwrap_or_default();
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "item" || name == "entry" {
                    if let Some(item) = current.take() {
                        items.push(item);
                    }
                    in_item = false;
                } else if in_item {
                    if let Some(item) = current.as_mut() {
                        match name.as_str() {
                            "title" => item.title = text_buffer.clone(),
                            "link" if item.link.is_empty() => item.link = text_buffer.clone(),
                            "description" | "summary" | "content" if item.description.is_empty() => {
                                item.description = text_buffer.clone();
                            }
                            "pubDate" | "published" | "updated" if item.pub_date.is_empty() => {
                                item.pub_date = text_buffer.clone();
                            }
                            _ => {}
                        }
                    }
                }
                text_buffer.clear();
                let _ = &current_tag;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(error = %e, "feed parse error, returning entries found so far");
                break;
            }
            _ => {}
        }
    }

    items
}

fn to_record(item: FeedItem, opts: &FeedOpts) -> Option<RawRecord> {
    if item.title.is_empty() || item.link.is_empty() {
        return None;
    }

    let published_at = parse_feed_timestamp(&item.pub_date);

    Some(RawRecord {
        upstream_id: item.link.clone(),
        source_type: SourceType::Feed,
        title: item.title,
        raw_summary: clean_summary(&item.description, SUMMARY_CLIP),
        url: item.link,
        published_at,
        author: None,
        score: None,
        tags: opts.tags.clone(),
        lang_hint: None,
        story_kind: None,
        extra: Default::default(),
    })
}

fn parse_feed_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0"?>
<rss><channel>
  <item>
    <title>AI breakthrough</title>
    <link>https://example.com/a</link>
    <description><![CDATA[<p>Some <b>html</b> text</p>]]></description>
    <pubDate>Tue, 01 Jul 2026 00:00:00 GMT</pubDate>
  </item>
  <item>
    <title>No link here</title>
  </item>
</channel></rss>"#;

    #[test]
    fn parses_valid_item_and_skips_incomplete_one() {
        let items = parse_items(RSS_SAMPLE);
        assert_eq!(items.len(), 2);
        let records: Vec<_> = items
            .into_iter()
            .filter_map(|i| to_record(i, &FeedOpts::default()))
            .collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "AI breakthrough");
        assert!(records[0].published_at.is_some());
    }

    #[test]
    fn strips_html_from_description() {
        let items = parse_items(RSS_SAMPLE);
        let record = to_record(items[0].clone(), &FeedOpts::default()).unwrap();
        assert_eq!(record.raw_summary, "Some html text");
    }
}
