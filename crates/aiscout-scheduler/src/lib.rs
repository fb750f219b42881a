//! Time-of-day scheduler (spec.md §4.I), grounded on the teacher's
//! multi-source scheduling design generalized to arbitrary sources.
//!
//! A minute-tick loop compares each configured source's `HH:MM` triggers
//! against the current time and fires matching sources concurrently. Each
//! source has its own overlap guard so a slow run never blocks, or is
//! double-fired by, another.

use aiscout_config::Config;
use aiscout_pipeline::{PipelineEngine, PipelineRunSummary};
use aiscout_utils::time::now;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{interval, Duration as TokioDuration};
use tracing::{info, warn};

const TICK_INTERVAL_SECS: u64 = 60;

/// Rolling counters exposed by the `status` CLI subcommand.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub total_syncs: u64,
    pub success_count: u64,
    pub failed_sources: Vec<String>,
    pub last_sync_time: Option<chrono::DateTime<chrono::Utc>>,
}

pub struct Scheduler {
    config: Config,
    engine: Arc<PipelineEngine>,
    locks: HashMap<String, Arc<AsyncMutex<()>>>,
    fired: Mutex<HashMap<String, String>>,
    stats: Mutex<SyncStats>,
}

impl Scheduler {
    pub fn new(config: Config, engine: Arc<PipelineEngine>) -> Self {
        let locks = config
            .sources
            .keys()
            .map(|key| (key.clone(), Arc::new(AsyncMutex::new(()))))
            .collect();
        Self {
            config,
            engine,
            locks,
            fired: Mutex::new(HashMap::new()),
            stats: Mutex::new(SyncStats::default()),
        }
    }

    pub fn stats(&self) -> SyncStats {
        self.stats.lock().clone()
    }

    /// Runs every enabled scheduled source once, concurrently, independent
    /// of its configured time-of-day (the CLI's `schedule once`).
    pub async fn run_once(&self) -> Vec<PipelineRunSummary> {
        let keys: Vec<String> = self
            .config
            .scheduler
            .tasks
            .iter()
            .filter(|(_, task)| task.enabled)
            .map(|(key, _)| key.clone())
            .collect();

        if keys.is_empty() {
            warn!("no enabled scheduled sources to run");
            return Vec::new();
        }

        let runs = keys.iter().map(|key| self.run_source_guarded(key));
        futures::future::join_all(runs)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Runs the minute-tick loop until the process is stopped. No-op if the
    /// global scheduler switch is off.
    pub async fn serve(&self) {
        if !self.config.scheduler.enabled {
            warn!("scheduler globally disabled, not starting the serve loop");
            return;
        }

        info!(tasks = self.config.scheduler.tasks.len(), "scheduler starting");
        let mut tick = interval(TokioDuration::from_secs(TICK_INTERVAL_SECS));
        loop {
            tick.tick().await;
            self.check_and_fire().await;
        }
    }

    async fn check_and_fire(&self) {
        let current = now();
        let minute_stamp = current.format("%Y-%m-%d %H:%M").to_string();
        let current_hhmm = current.format("%H:%M").to_string();

        let mut to_fire = Vec::new();
        for (key, task) in &self.config.scheduler.tasks {
            if !task.enabled || !task.time.iter().any(|t| t == &current_hhmm) {
                continue;
            }
            let fire_key = format!("{key}|{current_hhmm}");
            let mut fired = self.fired.lock();
            if fired.get(&fire_key) == Some(&minute_stamp) {
                continue;
            }
            fired.insert(fire_key, minute_stamp.clone());
            to_fire.push(key.clone());
        }

        if to_fire.is_empty() {
            return;
        }

        let runs = to_fire.iter().map(|key| self.run_source_guarded(key));
        futures::future::join_all(runs).await;
    }

    /// Runs one source under its overlap guard. Returns `None` (and skips
    /// the run) if the source is unknown or already running.
    async fn run_source_guarded(&self, key: &str) -> Option<PipelineRunSummary> {
        let Some(source) = self.config.source(key) else {
            warn!(source = key, "scheduled task references unknown source");
            return None;
        };
        let lock = self.locks.get(key)?;
        let Ok(_guard) = lock.try_lock() else {
            warn!(source = key, "previous run still in flight, skipping this tick");
            return None;
        };

        let mut effective = source.clone();
        if let Some(task) = self.config.scheduler.tasks.get(key) {
            if task.max_results > 0 {
                effective.common.fetch_limit = task.max_results;
            }
        }

        info!(source = key, "running scheduled sync");
        let summary = self
            .engine
            .run_source(key, &effective, self.config.llm.recent_days)
            .await;

        let mut stats = self.stats.lock();
        stats.total_syncs += 1;
        stats.last_sync_time = Some(now());
        if summary.success {
            stats.success_count += 1;
        } else {
            stats.failed_sources.push(key.to_string());
        }
        drop(stats);

        Some(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiscout_config::{CommonFields, FeedOpts, LlmConfig, SchedulerConfig, SourceConfig, SourceVariant, TaskSchedule};
    use aiscout_http::HttpClient;
    use aiscout_llm::Classifier;
    use aiscout_sink::IncrementalSink;
    use aiscout_store::ProjectStore;
    use aiscout_translate::Translator;
    use camino::Utf8PathBuf;
    use std::collections::BTreeMap;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS_SAMPLE: &str = r#"<?xml version="1.0"?>
<rss><channel>
  <item>
    <title>AI breakthrough</title>
    <link>https://example.com/a</link>
    <description>models</description>
  </item>
</channel></rss>"#;

    fn engine(tmp: &tempfile::TempDir) -> Arc<PipelineEngine> {
        let http = HttpClient::new("aiscout-test/0.1").unwrap();
        let classifier = Classifier::new(http.clone(), LlmConfig::default());
        let translator = Translator::new(http.clone(), LlmConfig::default(), "en");
        let store_path = Utf8PathBuf::from_path_buf(tmp.path().join("projects.json")).unwrap();
        let store = Arc::new(ProjectStore::load(&store_path).unwrap());
        let sink = Arc::new(IncrementalSink::new(
            Utf8PathBuf::from_path_buf(tmp.path().join("output")).unwrap(),
        ));
        let fetch_cache = Arc::new(aiscout_cache::TtlCache::new());
        Arc::new(PipelineEngine::new(http, classifier, translator, store, sink, fetch_cache, 1800))
    }

    fn config_with_source(url: String) -> Config {
        let mut sources = BTreeMap::new();
        sources.insert(
            "feed".to_string(),
            SourceConfig {
                key: "feed".to_string(),
                common: CommonFields {
                    url: Some(url),
                    ai_filter_enabled: false,
                    translation_enabled: false,
                    ..Default::default()
                },
                variant: SourceVariant::Feed(FeedOpts::default()),
            },
        );

        let mut tasks = BTreeMap::new();
        tasks.insert(
            "feed".to_string(),
            TaskSchedule {
                enabled: true,
                time: vec!["08:00".to_string()],
                max_results: 5,
            },
        );

        Config {
            scheduler: SchedulerConfig { enabled: true, tasks },
            sources,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn run_once_executes_every_enabled_task() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS_SAMPLE))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let config = config_with_source(server.uri());
        let scheduler = Scheduler::new(config, engine(&tmp));

        let summaries = scheduler.run_once().await;
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].success);
        assert_eq!(scheduler.stats().total_syncs, 1);
    }

    #[tokio::test]
    async fn disabled_global_switch_skips_serve() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = config_with_source("http://127.0.0.1:1".to_string());
        config.scheduler.enabled = false;
        let scheduler = Scheduler::new(config, engine(&tmp));

        // serve() returns immediately without looping forever.
        tokio::time::timeout(std::time::Duration::from_secs(2), scheduler.serve())
            .await
            .expect("serve should return immediately when disabled");
    }

    #[tokio::test]
    async fn unknown_scheduled_source_is_skipped_gracefully() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = config_with_source("http://127.0.0.1:1".to_string());
        config.scheduler.tasks.insert(
            "ghost".to_string(),
            TaskSchedule {
                enabled: true,
                time: vec!["09:00".to_string()],
                max_results: 5,
            },
        );
        let scheduler = Scheduler::new(config, engine(&tmp));
        let summaries = scheduler.run_once().await;
        // Only "feed" ran; "ghost" has no matching source and is skipped.
        assert_eq!(summaries.len(), 1);
    }
}
