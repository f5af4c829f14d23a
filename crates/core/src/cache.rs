//! Process-local response cache with TTL and data-timestamp staleness.
//!
//! An entry is trusted only while it is younger than its TTL *and* the
//! newest `updated_at` across the tables it was built from has not moved
//! past the timestamp recorded when it was cached. The cache is purely an
//! optimization: it may be cleared at any moment and is never shared
//! between server processes.
//!
//! No lock is held across a database call. Two requests that miss at the
//! same time both recompute and the later `set` wins, which is harmless
//! because each write replaces the whole entry.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::types::Timestamp;

/// A single cached value.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: V,
    pub cached_at: Instant,
    pub ttl: Duration,
    /// Latest data timestamp observed when the value was computed.
    pub data_timestamp: Option<Timestamp>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.cached_at) >= self.ttl
    }
}

/// Keyed cache of computed responses.
pub struct ResponseCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached value if present and within its TTL.
    ///
    /// An expired entry is removed. This check knows nothing about data
    /// freshness; callers run [`is_stale`](Self::is_stale) first.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.data.clone()),
                Some(_) => {}
            }
        }
        self.entries.write().await.remove(key);
        None
    }

    /// Store a value, replacing any existing entry.
    pub async fn set(
        &self,
        key: impl Into<String>,
        data: V,
        data_timestamp: Option<Timestamp>,
        ttl: Duration,
    ) {
        let entry = CacheEntry {
            data,
            cached_at: Instant::now(),
            ttl,
            data_timestamp,
        };
        self.entries.write().await.insert(key.into(), entry);
    }

    /// Whether the entry for `key` must not be served given the newest data
    /// timestamp currently in the database.
    ///
    /// Stale when there is no entry, the entry recorded no data timestamp,
    /// or `latest` is newer than the recorded one. `latest = None` means the
    /// current timestamp could not be determined and is treated as stale.
    /// Stale entries are evicted immediately.
    pub async fn is_stale(&self, key: &str, latest: Option<Timestamp>) -> bool {
        let stale = {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return true,
                Some(entry) => match (entry.data_timestamp, latest) {
                    (Some(cached), Some(latest)) => latest > cached,
                    _ => true,
                },
            }
        };
        if stale {
            self.entries.write().await.remove(key);
        }
        stale
    }

    /// Drop a single entry.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Drop every entry. Returns how many were removed.
    pub async fn clear(&self) -> usize {
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
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ts(secs: i64) -> Timestamp {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    const TTL: Duration = Duration::from_secs(5);

    #[tokio::test(start_paused = true)]
    async fn get_returns_value_within_ttl() {
        let cache = ResponseCache::new();
        cache.set("k", 1, Some(ts(100)), TTL).await;

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(cache.get("k").await, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn get_evicts_after_ttl() {
        let cache = ResponseCache::new();
        cache.set("k", 1, Some(ts(100)), TTL).await;

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.get("k").await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn missing_entry_is_stale() {
        let cache: ResponseCache<i32> = ResponseCache::new();
        assert!(cache.is_stale("k", Some(ts(100))).await);
    }

    #[tokio::test]
    async fn entry_without_data_timestamp_is_stale() {
        let cache = ResponseCache::new();
        cache.set("k", 1, None, TTL).await;
        assert!(cache.is_stale("k", Some(ts(100))).await);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn newer_write_makes_entry_stale_within_ttl() {
        let cache = ResponseCache::new();
        cache.set("k", 1, Some(ts(100)), TTL).await;

        assert!(!cache.is_stale("k", Some(ts(100))).await);
        assert!(cache.is_stale("k", Some(ts(101))).await);
        // Evicted on detection.
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn unknown_latest_timestamp_is_stale() {
        let cache = ResponseCache::new();
        cache.set("k", 1, Some(ts(100)), TTL).await;
        assert!(cache.is_stale("k", None).await);
    }

    #[tokio::test]
    async fn set_overwrites_and_clear_drops_everything() {
        let cache = ResponseCache::new();
        cache.set("a", 1, Some(ts(1)), TTL).await;
        cache.set("a", 2, Some(ts(2)), TTL).await;
        cache.set("b", 3, Some(ts(3)), TTL).await;

        assert_eq!(cache.get("a").await, Some(2));
        assert_eq!(cache.clear().await, 2);
        assert!(cache.is_empty().await);
    }
}
