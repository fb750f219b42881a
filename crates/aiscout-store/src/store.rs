//! Durable, keyed project state store (spec.md §4.F).

use crate::record::{ProjectRecord, RecordMap, Status};
use aiscout_utils::error::PersistenceError;
use aiscout_utils::time::now;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Duration;
use parking_lot::Mutex;
use std::collections::BTreeMap;

const WHITELIST_TTL_DAYS: i64 = 30;

#[derive(Debug, Default, Clone)]
pub struct Statistics {
    pub by_status: BTreeMap<String, usize>,
    pub by_language: BTreeMap<String, usize>,
    pub by_origin_kind: BTreeMap<String, usize>,
    pub total: usize,
}

/// Single structured JSON file, one writer at a time (the whole store is
/// guarded by one mutex — a given process never needs finer-grained
/// locking than that).
pub struct ProjectStore {
    path: Utf8PathBuf,
    records: Mutex<RecordMap>,
}

impl ProjectStore {
    pub fn load(path: &Utf8Path) -> Result<Self, PersistenceError> {
        let records = if path.exists() {
            let text = std::fs::read_to_string(path.as_std_path()).map_err(|e| {
                PersistenceError::Read {
                    path: path.to_string(),
                    source: e,
                }
            })?;
            let raw: RecordMap =
                serde_json::from_str(&text).map_err(|e| PersistenceError::Parse {
                    path: path.to_string(),
                    source: e,
                })?;
            raw.into_iter()
                .map(|(k, v)| (k, v.normalize()))
                .collect()
        } else {
            RecordMap::new()
        };

        Ok(Self {
            path: path.to_owned(),
            records: Mutex::new(records),
        })
    }

    fn persist(&self, records: &RecordMap) -> Result<(), PersistenceError> {
        let text = serde_json::to_string_pretty(records).map_err(|e| PersistenceError::Parse {
            path: self.path.to_string(),
            source: e,
        })?;
        aiscout_utils::atomic_write::write_file_atomic(&self.path, &text).map_err(|e| {
            PersistenceError::Write {
                path: self.path.to_string(),
                source: e,
            }
        })?;
        Ok(())
    }

    /// Monotonic-status upsert (spec.md §4.F steps 1-4). `key` is the
    /// canonical URL.
    pub fn upsert(&self, key: &str, incoming: ProjectRecord) -> Result<ProjectRecord, PersistenceError> {
        let mut records = self.records.lock();
        let merged = match records.get(key) {
            Some(existing) => merge(existing, &incoming),
            None => incoming,
        };
        records.insert(key.to_string(), merged.clone());
        self.persist(&records)?;
        Ok(merged)
    }

    /// Evaluates whitelist validity, demoting an expired record and
    /// persisting the transition before returning `false`.
    pub fn is_whitelisted(&self, key: &str) -> Result<bool, PersistenceError> {
        let mut records = self.records.lock();
        let Some(record) = records.get(key).cloned() else {
            return Ok(false);
        };
        if record.status != Status::Whitelisted {
            return Ok(false);
        }
        let still_valid = record
            .whitelisted_until
            .map(|until| until > now())
            .unwrap_or(false);
        if still_valid {
            return Ok(true);
        }

        let mut expired = record;
        expired.status = Status::Expired;
        records.insert(key.to_string(), expired);
        self.persist(&records)?;
        Ok(false)
    }

    pub fn get(&self, key: &str) -> Option<ProjectRecord> {
        self.records.lock().get(key).cloned()
    }

    pub fn statistics(&self) -> Statistics {
        let records = self.records.lock();
        let mut stats = Statistics {
            total: records.len(),
            ..Default::default()
        };
        for record in records.values() {
            *stats
                .by_status
                .entry(format!("{:?}", record.status))
                .or_default() += 1;
            if let Some(lang) = &record.language {
                *stats.by_language.entry(lang.clone()).or_default() += 1;
            }
            if !record.origin_kind.is_empty() {
                *stats
                    .by_origin_kind
                    .entry(record.origin_kind.clone())
                    .or_default() += 1;
            }
        }
        stats
    }

    /// Removes records whose `last_seen` is older than `days`. Returns the
    /// number removed.
    pub fn cleanup_expired(&self, days: i64) -> Result<usize, PersistenceError> {
        let cutoff = now() - Duration::days(days);
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, r| r.last_seen >= cutoff);
        let removed = before - records.len();
        if removed > 0 {
            self.persist(&records)?;
        }
        Ok(removed)
    }
}

fn merge(existing: &ProjectRecord, incoming: &ProjectRecord) -> ProjectRecord {
    let s_eff = existing.status.max_for_upsert(incoming.status);
    let mut merged = existing.clone();

    merged.status = s_eff;
    merged.last_seen = incoming.last_seen;
    merged.tags = incoming.tags.clone();
    merged.title = incoming.title.clone();
    merged.summary = incoming.summary.clone();
    merged.published_at = incoming.published_at.or(existing.published_at);
    merged.language = incoming.language.clone().or(existing.language.clone());
    merged.extra = incoming.extra.clone();
    merged.full_name = incoming.full_name.clone().or(existing.full_name.clone());
    merged.origin_kind = if incoming.origin_kind.is_empty() {
        existing.origin_kind.clone()
    } else {
        incoming.origin_kind.clone()
    };

    if incoming.status >= Status::AiScreened {
        merged.ai_score = incoming.ai_score;
        merged.ai_reason = incoming.ai_reason.clone();
        merged.last_screened_at = incoming.last_screened_at;
    }

    if s_eff == Status::Whitelisted {
        merged.whitelisted_until = if existing.status != Status::Whitelisted {
            Some(now() + Duration::days(WHITELIST_TTL_DAYS))
        } else {
            existing.whitelisted_until
        };
    } else {
        merged.whitelisted_until = existing.whitelisted_until;
    }

    merged
}
