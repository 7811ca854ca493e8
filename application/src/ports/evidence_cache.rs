//! Port for the query-keyed evidence cache.

use async_trait::async_trait;
use council_domain::evidence::EvidenceCacheEntry;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Keyed by query hash. Implementations may return expired entries;
/// the retriever decides whether a stale entry is still trustworthy.
#[async_trait]
pub trait EvidenceCache: Send + Sync {
    async fn get(&self, query_hash: &str) -> Result<Option<EvidenceCacheEntry>, CacheError>;

    async fn set(&self, query_hash: &str, entry: EvidenceCacheEntry) -> Result<(), CacheError>;
}
