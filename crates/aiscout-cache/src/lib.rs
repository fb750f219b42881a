//! Process-local TTL cache (spec.md §4.B).
//!
//! Generalizes the teacher's content-hash-keyed [`InsightCache`] into a
//! plain `key -> (value, expires_at)` store shared by fetch-result
//! memoization and per-article translation memoization. Does not persist
//! across process restarts.

use aiscout_utils::time::now;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// A thread-safe, in-memory TTL cache. `V` is cloned out on `get`, so
/// callers typically store cheaply-cloneable values (`String`,
/// `Arc<...>`, small structs).
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
    stats: Mutex<CacheStats>,
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Returns the cached value, or `None` if absent or expired. An expired
    /// entry is removed lazily on this call, matching the `get` contract.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock();
        let hit = match entries.get(key) {
            Some(entry) if entry.expires_at > now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                self.stats.lock().expirations += 1;
                None
            }
            None => None,
        };
        let mut stats = self.stats.lock();
        if hit.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        hit
    }

    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let expires_at = now() + ttl;
        self.entries.lock().insert(key.into(), Entry { value, expires_at });
    }

    pub fn delete(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    /// Sweeps all expired entries, independent of `get`. Returns the number
    /// removed. Callers may run this periodically to bound memory use for
    /// keys that are never re-queried.
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        let cutoff = now();
        entries.retain(|_, entry| entry.expires_at > cutoff);
        let removed = before - entries.len();
        if removed > 0 {
            self.stats.lock().expirations += removed as u64;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }
}
