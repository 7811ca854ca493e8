//! In-memory evidence cache keyed by query hash.
//!
//! Expired entries are returned as-is; the caller decides whether a
//! stale entry is still trustworthy (the outage fallback depends on
//! seeing them). `purge_expired` exists for housekeeping.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use council_application::ports::{CacheError, EvidenceCache};
use council_domain::evidence::EvidenceCacheEntry;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryEvidenceCache {
    entries: RwLock<HashMap<String, EvidenceCacheEntry>>,
}

impl InMemoryEvidenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop entries that expired before `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

#[async_trait]
impl EvidenceCache for InMemoryEvidenceCache {
    async fn get(&self, query_hash: &str) -> Result<Option<EvidenceCacheEntry>, CacheError> {
        Ok(self.entries.read().await.get(query_hash).cloned())
    }

    async fn set(&self, query_hash: &str, entry: EvidenceCacheEntry) -> Result<(), CacheError> {
        self.entries
            .write()
            .await
            .insert(query_hash.to_string(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use council_domain::evidence::{EvidenceTrail, KgHealthStatus};

    fn entry(ttl: Duration) -> EvidenceCacheEntry {
        let trail = EvidenceTrail::new(3, Duration::minutes(5));
        EvidenceCacheEntry::from_trail("h", &trail, KgHealthStatus::Healthy, ttl, Utc::now())
    }

    #[tokio::test]
    async fn test_returns_expired_entries() {
        let cache = InMemoryEvidenceCache::new();
        cache.set("h", entry(Duration::minutes(-1))).await.unwrap();

        let cached = cache.get("h").await.unwrap().unwrap();
        assert!(cached.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired() {
        let cache = InMemoryEvidenceCache::new();
        cache.set("old", entry(Duration::minutes(-1))).await.unwrap();
        cache.set("new", entry(Duration::minutes(5))).await.unwrap();

        assert_eq!(cache.purge_expired(Utc::now()).await, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.get("new").await.unwrap().is_some());
    }
}
