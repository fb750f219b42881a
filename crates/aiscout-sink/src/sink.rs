//! Daily-bucketed incremental sink (spec.md §4.J).
//!
//! One structured JSON file per `(source, day)`. Each append-batch call
//! reads the current file (or starts an empty one), merges new items in
//! keyed by [`NormalizedItem::dedup_key`], recomputes the aggregate
//! count, and writes back atomically.

use crate::item::NormalizedItem;
use aiscout_utils::atomic_write::write_file_atomic;
use aiscout_utils::error::PersistenceError;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use tracing::debug;

const DEFAULT_BASE_DIR: &str = "output";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SinkDocument {
    pub source: String,
    pub updated_at: Option<chrono::DateTime<Utc>>,
    pub total_count: usize,
    pub items: Vec<NormalizedItem>,
}

pub struct IncrementalSink {
    base_dir: Utf8PathBuf,
}

impl IncrementalSink {
    pub fn new(base_dir: impl Into<Utf8PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    /// Sink rooted at `./output`, matching the teacher's default layout.
    pub fn with_default_dir() -> Self {
        Self::new(DEFAULT_BASE_DIR)
    }

    pub fn daily_dir(&self, day: NaiveDate) -> Utf8PathBuf {
        self.base_dir.join("daily").join(day.format("%Y-%m-%d").to_string())
    }

    pub fn file_path(&self, source: &str, day: NaiveDate) -> Utf8PathBuf {
        self.daily_dir(day).join(format!("{source}.json"))
    }

    /// Appends `items` to the `(source, day)` file, deduplicating by
    /// [`NormalizedItem::dedup_key`] (last write wins for a given key).
    pub fn append_batch(
        &self,
        source: &str,
        day: NaiveDate,
        items: Vec<NormalizedItem>,
    ) -> Result<Utf8PathBuf, PersistenceError> {
        let path = self.file_path(source, day);
        let mut doc = self.read_document(&path, source)?;

        let mut index: HashMap<String, usize> = doc
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.dedup_key().to_string(), i))
            .collect();

        for item in items {
            let key = item.dedup_key().to_string();
            if let Some(&pos) = index.get(&key) {
                doc.items[pos] = item;
            } else {
                index.insert(key, doc.items.len());
                doc.items.push(item);
            }
        }

        doc.total_count = doc.items.len();
        doc.updated_at = Some(Utc::now());

        let json = serde_json::to_string_pretty(&doc).map_err(|e| PersistenceError::Parse {
            path: path.to_string(),
            source: e,
        })?;
        write_file_atomic(&path, &json).map_err(|e| PersistenceError::Write {
            path: path.to_string(),
            source: e,
        })?;

        debug!(source, count = doc.total_count, %path, "appended batch to sink");
        Ok(path)
    }

    fn read_document(&self, path: &Utf8Path, source: &str) -> Result<SinkDocument, PersistenceError> {
        if !path.as_std_path().exists() {
            return Ok(SinkDocument {
                source: source.to_string(),
                ..Default::default()
            });
        }

        let content = fs::read_to_string(path.as_std_path()).map_err(|e| PersistenceError::Read {
            path: path.to_string(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| PersistenceError::Parse {
            path: path.to_string(),
            source: e,
        })
    }

    pub fn read(&self, source: &str, day: NaiveDate) -> Result<Option<SinkDocument>, PersistenceError> {
        let path = self.file_path(source, day);
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        self.read_document(&path, source).map(Some)
    }
}
