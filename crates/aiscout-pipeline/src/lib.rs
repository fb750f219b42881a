//! Per-source pipeline engine (spec.md §4.H): fetch -> dedupe -> temporal
//! filter -> state-store partition -> classify -> checkpoint -> translate
//! & normalize -> sink append -> sort -> memoize.

mod heuristic;

use aiscout_adapters::{clean_summary, fetch_source, RawRecord};
use aiscout_cache::TtlCache;
use aiscout_config::{SourceConfig, SourceVariant};
use aiscout_http::HttpClient;
use aiscout_llm::Classifier;
use aiscout_sink::{IncrementalSink, NormalizedItem};
use aiscout_store::{ProjectRecord, ProjectStore, Status};
use aiscout_translate::{clip_code_points, Translator};
use aiscout_utils::time::now;
use chrono::Duration;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{info, warn};

const CLASSIFY_BATCH: usize = 25;
const TRANSLATE_BATCH: usize = 20;
const TRANSLATE_CONCURRENCY: usize = 5;
const PRE_TRANSLATE_CLIP: usize = 500;
const FINAL_SUMMARY_CLIP: usize = 300;

/// Outcome of one pipeline invocation, cached in the fetch cache and
/// returned to the scheduler/CLI caller.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineRunSummary {
    pub source: String,
    pub fetched: usize,
    pub classified: usize,
    pub emitted: usize,
    pub success: bool,
    pub reason: Option<String>,
    pub items: Vec<NormalizedItem>,
}

pub struct PipelineEngine {
    http: HttpClient,
    classifier: Classifier,
    translator: Translator,
    store: Arc<ProjectStore>,
    sink: Arc<IncrementalSink>,
    fetch_cache: Arc<TtlCache<PipelineRunSummary>>,
    default_cache_ttl_secs: i64,
}

impl PipelineEngine {
    pub fn new(
        http: HttpClient,
        classifier: Classifier,
        translator: Translator,
        store: Arc<ProjectStore>,
        sink: Arc<IncrementalSink>,
        fetch_cache: Arc<TtlCache<PipelineRunSummary>>,
        default_cache_ttl_secs: i64,
    ) -> Self {
        Self {
            http,
            classifier,
            translator,
            store,
            sink,
            fetch_cache,
            default_cache_ttl_secs,
        }
    }

    /// Runs one end-to-end invocation for `source_key`. `recent_days`
    /// is the LLM config's temporal window, overridable per source.
    pub async fn run_source(
        &self,
        source_key: &str,
        source: &SourceConfig,
        recent_days: i64,
    ) -> PipelineRunSummary {
        let cache_key = format!("{source_key}|{}", source_config_fingerprint(source));

        // 1. Fetch cache check.
        if let Some(cached) = self.fetch_cache.get(&cache_key) {
            info!(source_key, "serving memoized run result");
            return cached;
        }

        // 2. Fetch. An empty result is a successful no-op run, not a
        // failure: the adapter legitimately had nothing new to report.
        let records = fetch_source(&self.http, source).await;
        if records.is_empty() {
            let summary = PipelineRunSummary {
                source: source_key.to_string(),
                success: true,
                reason: Some("adapter returned no records".to_string()),
                ..Default::default()
            };
            self.memoize(&cache_key, source, &summary);
            return summary;
        }
        let fetched = records.len();

        // 3. Dedup by upstream_id within this run.
        let mut seen_ids = HashSet::new();
        let records: Vec<RawRecord> = records
            .into_iter()
            .filter(|r| seen_ids.insert(r.upstream_id.clone()))
            .collect();

        // 4. Temporal filter.
        let recent_days = source.common.recent_days.unwrap_or(recent_days);
        let cutoff = now() - Duration::days(recent_days);
        let records: Vec<RawRecord> = records
            .into_iter()
            .filter(|r| r.published_at.map(|t| t >= cutoff).unwrap_or(true))
            .collect();

        // 5/6/7. Partition, classify, checkpoint.
        let (to_translate, classified) = if source.common.ai_filter_enabled {
            self.partition_and_classify(source_key, records).await
        } else {
            let items = records.into_iter().map(|r| (r, None)).collect();
            (items, 0)
        };

        // 8. Translate & normalize, appending to the sink in batches of 20.
        let mut emitted = Vec::with_capacity(to_translate.len());
        for chunk in to_translate.chunks(TRANSLATE_BATCH) {
            let normalized: Vec<NormalizedItem> = stream::iter(chunk.to_vec())
                .map(|(record, ai_score)| {
                    let translation_enabled = source.common.translation_enabled;
                    async move { self.normalize_item(record, ai_score, translation_enabled).await }
                })
                .buffer_unordered(TRANSLATE_CONCURRENCY)
                .collect()
                .await;

            if let Err(e) = self.sink.append_batch(source_key, now().date_naive(), normalized.clone()) {
                warn!(source_key, error = %e, "failed to append batch to sink");
            }
            emitted.extend(normalized);
        }

        // 9. Sort.
        emitted.sort_by(|a, b| {
            let score_a = a.ai_score.unwrap_or(0.0);
            let score_b = b.ai_score.unwrap_or(0.0);
            score_b
                .partial_cmp(&score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.score.unwrap_or(0).cmp(&a.score.unwrap_or(0)))
        });

        let summary = PipelineRunSummary {
            source: source_key.to_string(),
            fetched,
            classified,
            emitted: emitted.len(),
            success: true,
            reason: None,
            items: emitted,
        };

        // 10. Memoize.
        self.memoize(&cache_key, source, &summary);
        summary
    }

    fn memoize(&self, cache_key: &str, source: &SourceConfig, summary: &PipelineRunSummary) {
        let ttl_secs = source.common.cache_ttl.unwrap_or(self.default_cache_ttl_secs as u64);
        self.fetch_cache
            .set(cache_key, summary.clone(), Duration::seconds(ttl_secs as i64));
    }

    /// Steps 5-7: bump `last_seen` for every fetched record, decide
    /// per-record whether a prior verdict can be reused, classify the
    /// remainder in checkpointed batches of 25.
    async fn partition_and_classify(
        &self,
        source_key: &str,
        records: Vec<RawRecord>,
    ) -> (Vec<(RawRecord, Option<f64>)>, usize) {
        let mut passthrough = Vec::new();
        let mut needs_classification = Vec::new();

        for record in records {
            let key = record.url.clone();
            let baseline = baseline_record(&record);
            let merged = match self.store.upsert(&key, baseline) {
                Ok(m) => m,
                Err(e) => {
                    warn!(source_key, url = %key, error = %e, "state-store upsert failed, classifying anyway");
                    needs_classification.push(record);
                    continue;
                }
            };

            let still_whitelisted = merged.status == Status::Whitelisted
                && self.store.is_whitelisted(&key).unwrap_or(false);

            if still_whitelisted || merged.status == Status::AiScreened {
                passthrough.push((record, Some(merged.ai_score as f64)));
            } else {
                needs_classification.push(record);
            }
        }

        let classified_count = needs_classification.len();
        let mut kept = passthrough;

        for chunk in needs_classification.chunks(CLASSIFY_BATCH) {
            let ids_titles: Vec<(String, String)> = chunk
                .iter()
                .map(|r| (r.upstream_id.clone(), r.title.clone()))
                .collect();
            let verdicts = self.classifier.classify(&ids_titles).await;

            for (record, verdict) in chunk.iter().zip(verdicts.iter()) {
                let key = record.url.clone();
                let ai_score = if verdict.keep { verdict.score } else { 0.0 };
                let incoming = screened_record(record, ai_score, &verdict.reason);

                match self.store.upsert(&key, incoming) {
                    Ok(merged) => {
                        if verdict.keep {
                            kept.push((record.clone(), Some(merged.ai_score as f64)));
                        }
                    }
                    Err(e) => warn!(source_key, url = %key, error = %e, "checkpoint upsert failed"),
                }
            }
        }

        (kept, classified_count)
    }

    async fn normalize_item(
        &self,
        record: RawRecord,
        ai_score: Option<f64>,
        translation_enabled: bool,
    ) -> NormalizedItem {
        let cleaned_summary = clean_summary(&record.raw_summary, PRE_TRANSLATE_CLIP);

        let (title, summary) = if translation_enabled {
            let pair = self
                .translator
                .translate_item(&record.upstream_id, &record.title, &cleaned_summary)
                .await;
            (pair.title, pair.summary)
        } else {
            (record.title.clone(), clip_code_points(&cleaned_summary, FINAL_SUMMARY_CLIP))
        };

        let tags: Vec<String> = record.tags.iter().take(5).cloned().collect();
        let article_tag = heuristic::classify(record.source_type, &tags);
        let comments_count = record.extra.get("comments_count").and_then(|v| v.as_i64());

        NormalizedItem {
            title,
            summary,
            url: record.url,
            source_type: record.source_type,
            article_tag,
            published_at: record.published_at,
            author: record.author,
            score: record.score,
            comments_count,
            tags,
            story_kind: record.story_kind,
            ai_score,
        }
    }
}

/// Hashes everything in `source` that affects the fetch/filter/classify
/// pipeline, so the fetch cache key changes on any config delta touching
/// the source, not just `fetch_limit` (spec.md §9 design note).
fn source_config_fingerprint(source: &SourceConfig) -> u64 {
    let common_json = serde_json::to_string(&source.common).unwrap_or_default();
    let variant_json = match &source.variant {
        SourceVariant::Headline(opts) => serde_json::to_string(opts),
        SourceVariant::Repo(opts) => serde_json::to_string(opts),
        SourceVariant::Paper(opts) => serde_json::to_string(opts),
        SourceVariant::Feed(opts) => serde_json::to_string(opts),
    }
    .unwrap_or_default();

    let mut hasher = DefaultHasher::new();
    common_json.hash(&mut hasher);
    variant_json.hash(&mut hasher);
    hasher.finish()
}

fn baseline_record(record: &RawRecord) -> ProjectRecord {
    ProjectRecord {
        upstream_id: record.upstream_id.clone(),
        full_name: record
            .extra
            .get("full_name")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        title: record.title.clone(),
        summary: record.raw_summary.clone(),
        url: record.url.clone(),
        published_at: record.published_at,
        status: Status::Crawled,
        ai_score: 0.0,
        ai_reason: None,
        crawled_at: now(),
        last_screened_at: None,
        last_seen: now(),
        whitelisted_until: None,
        language: record.lang_hint.clone(),
        tags: record.tags.clone(),
        extra: record.extra.clone(),
        origin_kind: record.source_type.as_str().to_string(),
    }
}

fn screened_record(record: &RawRecord, ai_score: f32, reason: &str) -> ProjectRecord {
    let mut rec = baseline_record(record);
    rec.status = Status::AiScreened;
    rec.ai_score = ai_score;
    rec.ai_reason = Some(reason.to_string());
    rec.last_screened_at = Some(now());
    rec
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiscout_config::{CommonFields, FeedOpts, LlmConfig, SourceVariant};
    use camino::Utf8PathBuf;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS_SAMPLE: &str = r#"<?xml version="1.0"?>
<rss><channel>
  <item>
    <title>AI breakthrough</title>
    <link>https://example.com/a</link>
    <description>Something about models</description>
    <pubDate>Tue, 01 Jul 2026 00:00:00 GMT</pubDate>
  </item>
</channel></rss>"#;

    fn feed_source(url: String, ai_filter_enabled: bool) -> SourceConfig {
        SourceConfig {
            key: "feed".to_string(),
            common: CommonFields {
                url: Some(url),
                fetch_limit: 10,
                ai_filter_enabled,
                translation_enabled: false,
                ..Default::default()
            },
            variant: SourceVariant::Feed(FeedOpts::default()),
        }
    }

    fn engine_with_llm(tmp: &tempfile::TempDir, llm: LlmConfig) -> PipelineEngine {
        let http = HttpClient::new("aiscout-test/0.1").unwrap();
        let classifier = Classifier::new(http.clone(), llm);
        let translator = Translator::new(http.clone(), LlmConfig::default(), "en");
        let store_path = Utf8PathBuf::from_path_buf(tmp.path().join("projects.json")).unwrap();
        let store = Arc::new(ProjectStore::load(&store_path).unwrap());
        let sink = Arc::new(IncrementalSink::new(
            Utf8PathBuf::from_path_buf(tmp.path().join("output")).unwrap(),
        ));
        let fetch_cache = Arc::new(TtlCache::new());
        PipelineEngine::new(http, classifier, translator, store, sink, fetch_cache, 1800)
    }

    fn engine(tmp: &tempfile::TempDir) -> PipelineEngine {
        let http = HttpClient::new("aiscout-test/0.1").unwrap();
        let classifier = Classifier::new(http.clone(), LlmConfig::default());
        let translator = Translator::new(http.clone(), LlmConfig::default(), "en");
        let store_path = Utf8PathBuf::from_path_buf(tmp.path().join("projects.json")).unwrap();
        let store = Arc::new(ProjectStore::load(&store_path).unwrap());
        let sink = Arc::new(IncrementalSink::new(
            Utf8PathBuf::from_path_buf(tmp.path().join("output")).unwrap(),
        ));
        let fetch_cache = Arc::new(TtlCache::new());
        PipelineEngine::new(http, classifier, translator, store, sink, fetch_cache, 1800)
    }

    #[tokio::test]
    async fn empty_fetch_is_a_successful_no_op() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let eng = engine(&tmp);
        let source = feed_source(server.uri(), false);
        let summary = eng.run_source("feed", &source, 7).await;
        assert!(summary.success);
        assert_eq!(summary.fetched, 0);
        assert_eq!(summary.emitted, 0);
        assert!(summary.items.is_empty());
    }

    #[tokio::test]
    async fn ai_filter_disabled_skips_classification_and_leaves_ai_score_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS_SAMPLE))
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let eng = engine(&tmp);
        let source = feed_source(server.uri(), false);
        let summary = eng.run_source("feed", &source, 7).await;
        assert!(summary.success);
        assert_eq!(summary.emitted, 1);
        assert_eq!(summary.classified, 0);
        assert_eq!(summary.items[0].ai_score, None);
    }

    #[tokio::test]
    async fn second_run_is_served_from_fetch_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS_SAMPLE))
            .expect(1)
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let eng = engine(&tmp);
        let source = feed_source(server.uri(), false);
        let first = eng.run_source("feed", &source, 7).await;
        let second = eng.run_source("feed", &source, 7).await;
        assert_eq!(first.emitted, second.emitted);
    }

    #[tokio::test]
    async fn ai_filter_enabled_classifies_with_disabled_llm_and_keeps_everything() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS_SAMPLE))
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let eng = engine(&tmp);
        let source = feed_source(server.uri(), true);
        let summary = eng.run_source("feed", &source, 7).await;
        assert!(summary.success);
        assert_eq!(summary.classified, 1);
        assert_eq!(summary.emitted, 1);
        assert_eq!(summary.items[0].ai_score, Some(0.5));

        // A record the classifier already screened should pass through without
        // being re-submitted for classification on the next distinct run.
        let cutoff_source = feed_source(server.uri(), true);
        let again = eng.run_source("feed-again", &cutoff_source, 7).await;
        assert!(again.success);
    }

    #[tokio::test]
    async fn output_is_sorted_by_ai_score_descending() {
        let feed_server = MockServer::start().await;
        let two_items = r#"<?xml version="1.0"?>
<rss><channel>
  <item><title>Low relevance</title><link>https://example.com/low</link><description>x</description></item>
  <item><title>High relevance</title><link>https://example.com/high</link><description>y</description></item>
</channel></rss>"#;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(two_items))
            .mount(&feed_server)
            .await;

        let llm_server = MockServer::start().await;
        let body = serde_json::json!({
            "choices": [{"message": {"content":
                "[{\"id\":\"https://example.com/low\",\"score\":0.2,\"keep\":true,\"reason\":\"weak\"},\
                 {\"id\":\"https://example.com/high\",\"score\":0.9,\"keep\":true,\"reason\":\"strong\"}]"
            }}]
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&llm_server)
            .await;

        let llm_config = LlmConfig {
            enabled: true,
            provider: "openai-compatible".to_string(),
            api_key: "test-key".to_string(),
            api_url: llm_server.uri(),
            model_name: "gpt-4o-mini".to_string(),
            max_tokens: 512,
            temperature: 0.3,
            recent_days: 7,
            target_language: "zh".to_string(),
        };

        let tmp = tempfile::tempdir().unwrap();
        let eng = engine_with_llm(&tmp, llm_config);
        let source = feed_source(feed_server.uri(), true);
        let summary = eng.run_source("feed", &source, 7).await;

        assert!(summary.success);
        assert_eq!(summary.emitted, 2);
        assert!(summary.items[0].ai_score.unwrap() >= summary.items[1].ai_score.unwrap());
    }
}
