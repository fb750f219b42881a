//! Typed, reloadable configuration for the ingestion pipeline
//! (spec.md §4.A, §6).
//!
//! One structured TOML document is the single source of truth. [`Config`]
//! exposes typed sub-views over it; unrecognized keys are retained in a
//! side [`toml::Value`] tree so future source-specific knobs pass through
//! without a schema change (spec.md §9 design note).

mod model;
mod sources;

pub use model::{GlobalSettings, LlmConfig, SchedulerConfig, TaskSchedule};
pub use sources::{CommonFields, FeedOpts, HeadlineOpts, PaperOpts, RepoOpts, SourceConfig, SourceVariant};

use aiscout_utils::error::ConfigError;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

/// Top-level configuration snapshot.
///
/// Reload is atomic at the call-site: [`Config::load`] either returns a
/// fully-formed new snapshot or a [`ConfigError`] — it never mutates a
/// snapshot in place, so callers that hold an `Arc<Config>` simply swap the
/// pointer on success and keep serving the old one on failure.
#[derive(Debug, Clone)]
pub struct Config {
    pub global_settings: GlobalSettings,
    pub scheduler: SchedulerConfig,
    pub llm: LlmConfig,
    pub sources: BTreeMap<String, SourceConfig>,
    /// Raw document, retained for keys this crate doesn't model yet.
    pub raw: toml::Value,
    pub source_path: Option<Utf8PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            global_settings: GlobalSettings::default(),
            scheduler: SchedulerConfig::default(),
            llm: LlmConfig::default(),
            sources: BTreeMap::new(),
            raw: toml::Value::Table(Default::default()),
            source_path: None,
        }
    }
}

impl Config {
    /// Parse and validate a configuration document, failing the whole
    /// reload on any malformed value rather than partially applying it
    /// (spec.md §4.A contract).
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_std_path())
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_string()),
                _ => ConfigError::Io(e),
            })?;
        Self::parse(&text).map(|mut c| {
            c.source_path = Some(path.to_owned());
            c
        })
    }

    /// Parse a configuration document from an in-memory string. Split out
    /// from [`Config::load`] so tests and the CLI's `--config -` (stdin)
    /// path share one code path.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let raw: toml::Value =
            toml::from_str(text).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let global_settings = deserialize_section::<GlobalSettings>(&raw, "global_settings")?
            .unwrap_or_default();

        let scheduler = global_settings_scheduler(&raw)?;

        let llm = deserialize_section::<LlmConfig>(&raw, "llm")?.unwrap_or_default();

        let sources = sources::parse_sources(&raw)?;

        Ok(Self {
            global_settings,
            scheduler,
            llm,
            sources,
            raw,
            source_path: None,
        })
    }

    /// Returns the source keys whose effective configuration differs
    /// between `self` and `other`. Used by the pipeline engine's fetch
    /// cache, which the spec (§9 design note) says must be invalidated on
    /// any config delta touching the affected source.
    pub fn changed_sources(&self, other: &Config) -> HashSet<String> {
        let mut changed = HashSet::new();
        let keys: HashSet<&String> = self.sources.keys().chain(other.sources.keys()).collect();
        for key in keys {
            let a = self.sources.get(key);
            let b = other.sources.get(key);
            if a != b {
                changed.insert(key.clone());
            }
        }
        changed
    }

    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.get(name)
    }
}

fn global_settings_scheduler(raw: &toml::Value) -> Result<SchedulerConfig, ConfigError> {
    let scheduler = raw
        .get("global_settings")
        .and_then(|gs| gs.get("scheduler"))
        .cloned();
    match scheduler {
        Some(v) => SchedulerConfig::deserialize(v)
            .map_err(|e| ConfigError::Invalid(format!("global_settings.scheduler: {e}"))),
        None => Ok(SchedulerConfig::default()),
    }
}

/// Deserialize a named top-level table, returning `None` if absent and a
/// [`ConfigError::Invalid`] (never a panic) if present-but-malformed.
fn deserialize_section<T: serde::de::DeserializeOwned>(
    raw: &toml::Value,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match raw.get(key).cloned() {
        Some(v) => T::deserialize(v)
            .map(Some)
            .map_err(|e| ConfigError::Invalid(format!("{key}: {e}"))),
        None => Ok(None),
    }
}
