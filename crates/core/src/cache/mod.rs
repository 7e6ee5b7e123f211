//! In-memory, time-bounded cache of lookup results.
//!
//! Keys are normalized query keys (see [`Query::cache_key`]). Entries are
//! replaced wholesale on every store and removed by a periodic sweep once
//! they are older than the retention window. Expired entries that the sweep
//! has not reached yet are already reported as misses.
//!
//! Error results are never stored.
//!
//! [`Query::cache_key`]: crate::Query::cache_key

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::QueryResult;

/// A stored lookup result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: QueryResult,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, retention: chrono::Duration, now: DateTime<Utc>) -> bool {
        now - self.stored_at >= retention
    }
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheStats {
    pub entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_stored_at: Option<String>,
}

/// Shared result cache with a fixed retention window.
#[derive(Debug)]
pub struct ResultCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    retention: chrono::Duration,
}

impl ResultCache {
    /// Create an empty cache that retains entries for `retention`.
    pub fn new(retention: Duration) -> Self {
        let retention = chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::days(365));
        Self { entries: RwLock::new(HashMap::new()), retention }
    }

    /// Look up a result. Returns None on miss or when the entry has outlived the window.
    pub async fn get(&self, key: &str) -> Option<QueryResult> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.is_expired(self.retention, Utc::now()) {
            tracing::debug!("cache entry expired: {}", key);
            return None;
        }
        Some(entry.value.clone())
    }

    /// Store a result, overwriting any previous entry for the key.
    ///
    /// Returns false without storing when the result describes a failure.
    pub async fn store(&self, key: &str, value: QueryResult) -> bool {
        if value.is_error() {
            tracing::debug!("refusing to cache error result for {}", key);
            return false;
        }
        let entry = CacheEntry { key: key.to_string(), value, stored_at: Utc::now() };
        self.entries.write().await.insert(key.to_string(), entry);
        true
    }

    /// Remove entries older than the retention window.
    ///
    /// Returns the number of removed entries.
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(self.retention, now));
        before - entries.len()
    }

    /// Remove every entry. Returns the number of removed entries.
    pub async fn purge_all(&self) -> usize {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        count
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let oldest = entries.values().map(|e| e.stored_at).min();
        CacheStats {
            entries: entries.len(),
            oldest_stored_at: oldest.map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
        }
    }

    /// Run [`sweep`](Self::sweep) every `interval` on a background task.
    ///
    /// The task holds only a weak reference and exits once the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.sweep().await;
                if removed > 0 {
                    tracing::info!(removed, "swept expired cache entries");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    async fn backdate(cache: &ResultCache, key: &str, by: chrono::Duration) {
        let mut entries = cache.entries.write().await;
        let entry = entries.get_mut(key).unwrap();
        entry.stored_at -= by;
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let cache = ResultCache::new(HOUR);
        let result = QueryResult::found("Paris, Texas", "https://opac.example.org/x", 100);

        assert!(cache.store("paris, texas_1984", result.clone()).await);
        assert_eq!(cache.get("paris, texas_1984").await, Some(result));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = ResultCache::new(HOUR);
        assert!(cache.get("nonexistent_no-year").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_overwrites() {
        let cache = ResultCache::new(HOUR);
        cache.store("k", QueryResult::not_found("no results")).await;
        let newer = QueryResult::found("K", "https://opac.example.org/k", 90);
        cache.store("k", newer.clone()).await;

        assert_eq!(cache.get("k").await, Some(newer));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_error_results_not_stored() {
        let cache = ResultCache::new(HOUR);
        let failed = QueryResult::from_error(&crate::Error::Timeout("90000ms".into()));

        assert!(!cache.store("k", failed).await);
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = ResultCache::new(HOUR);
        cache.store("k", QueryResult::not_found("no results")).await;
        backdate(&cache, "k", chrono::Duration::minutes(61)).await;

        assert!(cache.get("k").await.is_none());
        // still present until swept
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let cache = ResultCache::new(HOUR);
        cache.store("old", QueryResult::not_found("no results")).await;
        cache.store("fresh", QueryResult::not_found("no results")).await;
        backdate(&cache, "old", chrono::Duration::minutes(90)).await;

        assert_eq!(cache.sweep().await, 1);
        assert!(cache.get("fresh").await.is_some());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_purge_all() {
        let cache = ResultCache::new(HOUR);
        cache.store("a", QueryResult::not_found("no results")).await;
        cache.store("b", QueryResult::not_found("no results")).await;

        assert_eq!(cache.purge_all().await, 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_stats() {
        let cache = ResultCache::new(HOUR);
        assert_eq!(cache.stats().await.entries, 0);
        assert!(cache.stats().await.oldest_stored_at.is_none());

        cache.store("a", QueryResult::not_found("no results")).await;
        let stats = cache.stats().await;
        assert_eq!(stats.entries, 1);
        assert!(stats.oldest_stored_at.is_some());
    }

    #[tokio::test]
    async fn test_spawn_sweeper_evicts() {
        let cache = Arc::new(ResultCache::new(HOUR));
        cache.store("old", QueryResult::not_found("no results")).await;
        backdate(&cache, "old", chrono::Duration::hours(2)).await;

        let handle = cache.spawn_sweeper(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.is_empty().await);
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweeper_exits_when_cache_dropped() {
        let cache = Arc::new(ResultCache::new(HOUR));
        let handle = cache.spawn_sweeper(Duration::from_millis(10));
        drop(cache);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should stop")
            .unwrap();
    }
}
