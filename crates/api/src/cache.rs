//! Response caches bound to the tables they are computed from.
//!
//! A [`StalenessOracle`] pairs a [`ResponseCache`] with the list of tables
//! whose rows feed it. Before a cached value is served, the newest
//! `updated_at` across those tables is compared with the timestamp recorded
//! when the value was cached. Any failure to determine that timestamp counts
//! as stale, so a broken freshness probe costs a recomputation and never
//! serves old data.

use std::time::Duration;

use dealerhub_core::cache::ResponseCache;
use dealerhub_core::types::Timestamp;
use dealerhub_db::repositories::FreshnessRepo;
use dealerhub_db::DbPool;

/// Outcome of a cache lookup.
#[derive(Debug)]
pub enum Lookup<V> {
    /// Fresh cached value.
    Hit(V),
    /// Nothing usable; `latest` is the data timestamp to record when the
    /// recomputed value is stored.
    Miss { latest: Option<Timestamp> },
}

/// Cache status reported in the `x-cache` response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
        }
    }
}

/// A response cache plus the tables its values are built from.
pub struct StalenessOracle<V> {
    cache: ResponseCache<V>,
    tables: &'static [&'static str],
}

impl<V: Clone> StalenessOracle<V> {
    pub fn new(tables: &'static [&'static str]) -> Self {
        Self {
            cache: ResponseCache::new(),
            tables,
        }
    }

    pub fn tables(&self) -> &'static [&'static str] {
        self.tables
    }

    /// Newest data timestamp across the bound tables.
    pub async fn latest(&self, pool: &DbPool) -> Option<Timestamp> {
        FreshnessRepo::latest_update_timestamp(pool, self.tables).await
    }

    /// Whether the entry for `key` must be recomputed. Fails open.
    pub async fn is_stale(&self, pool: &DbPool, key: &str) -> bool {
        let latest = self.latest(pool).await;
        self.cache.is_stale(key, latest).await
    }

    /// Staleness check followed by a TTL-bounded read.
    pub async fn lookup(&self, pool: &DbPool, key: &str) -> Lookup<V> {
        let latest = self.latest(pool).await;
        if self.cache.is_stale(key, latest).await {
            tracing::debug!(key, "Cache entry stale or absent");
            return Lookup::Miss { latest };
        }
        match self.cache.get(key).await {
            Some(value) => Lookup::Hit(value),
            None => Lookup::Miss { latest },
        }
    }

    pub async fn store(&self, key: &str, value: V, latest: Option<Timestamp>, ttl: Duration) {
        self.cache.set(key, value, latest, ttl).await;
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        self.cache.invalidate(key).await
    }

    /// Drop every entry. Returns how many were removed.
    pub async fn clear(&self) -> usize {
        self.cache.clear().await
    }

    pub async fn len(&self) -> usize {
        self.cache.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.is_empty().await
    }
}
