//! Cached evidence entries.
//!
//! Entries snapshot the knowledge graph's health at cache time so a
//! later outage can decide whether the cached data is trustworthy:
//! stale entries from an already-degraded graph are never trusted,
//! which keeps bad data from compounding during an incident.

use super::trail::{EvidenceTrail, TraversalStep};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Health of the knowledge graph observed at cache time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KgHealthStatus {
    Healthy,
    Degraded,
    Unavailable,
}

/// A cached evidence trail keyed by query hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceCacheEntry {
    pub query_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_text: Option<String>,
    pub node_ids: Vec<String>,
    pub traversal_path: Vec<TraversalStep>,
    pub relevance_scores: BTreeMap<String, f64>,
    pub hop_count: usize,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub kg_health_status: KgHealthStatus,
}

impl EvidenceCacheEntry {
    /// Snapshot a trail into a cache entry.
    pub fn from_trail(
        query_hash: impl Into<String>,
        trail: &EvidenceTrail,
        kg_health_status: KgHealthStatus,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            query_hash: query_hash.into(),
            query_text: None,
            node_ids: trail.node_ids.clone(),
            traversal_path: trail.traversal_path.clone(),
            relevance_scores: trail.relevance_scores.clone(),
            hop_count: trail.hop_count,
            cached_at: now,
            expires_at: now + ttl,
            kg_health_status,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.cached_at
    }

    /// Whether this entry may stand in for the live graph during an
    /// outage: only if the graph was healthy when it was cached AND the
    /// entry has not expired.
    pub fn is_trustworthy_during_outage(&self, now: DateTime<Utc>) -> bool {
        self.kg_health_status == KgHealthStatus::Healthy && !self.is_expired(now)
    }

    /// Rehydrate the cached data as a trail for a new deliberation.
    pub fn to_trail(&self, deliberation_id: impl Into<String>) -> EvidenceTrail {
        EvidenceTrail {
            id: Uuid::new_v4().to_string(),
            deliberation_id: deliberation_id.into(),
            node_ids: self.node_ids.clone(),
            traversal_path: self.traversal_path.clone(),
            relevance_scores: self.relevance_scores.clone(),
            hop_count: self.hop_count,
            cached_at: self.cached_at,
            expires_at: self.expires_at,
        }
    }
}
