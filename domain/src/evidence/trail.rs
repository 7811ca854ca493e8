//! Evidence trails - the traversal path and node set grounding a
//! deliberation.

use super::knowledge::EdgeType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A single edge step in a graph traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalStep {
    pub from_node_id: String,
    pub to_node_id: String,
    pub edge_type: EdgeType,
    pub weight: f64,
}

/// Knowledge-graph justification for a deliberation.
///
/// One-to-one with the deliberation, and optional: evidence-retrieval
/// failure degrades the deliberation instead of failing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceTrail {
    pub id: String,
    pub deliberation_id: String,
    /// Deduplicated node ids in visit order.
    pub node_ids: Vec<String>,
    pub traversal_path: Vec<TraversalStep>,
    /// node id → relevance score in [0, 1].
    pub relevance_scores: BTreeMap<String, f64>,
    pub hop_count: usize,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl EvidenceTrail {
    pub fn new(hop_count: usize, ttl: chrono::Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            deliberation_id: String::new(),
            node_ids: Vec::new(),
            traversal_path: Vec::new(),
            relevance_scores: BTreeMap::new(),
            hop_count,
            cached_at: now,
            expires_at: now + ttl,
        }
    }

    /// Average relevance over all scored nodes; 0.0 for an empty trail.
    pub fn average_relevance(&self) -> f64 {
        if self.relevance_scores.is_empty() {
            return 0.0;
        }
        let total: f64 = self.relevance_scores.values().sum();
        total / self.relevance_scores.len() as f64
    }
}

/// Classification of a trail's evidentiary strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSufficiency {
    Sufficient,
    Insufficient,
    None,
}

/// Gate deciding whether a deliberation proceeds with low-confidence
/// grounding or flags uncertainty.
pub fn assess_sufficiency(
    trail: Option<&EvidenceTrail>,
    min_nodes: usize,
    min_relevance: f64,
) -> EvidenceSufficiency {
    let Some(trail) = trail else {
        return EvidenceSufficiency::None;
    };
    if trail.node_ids.is_empty() {
        return EvidenceSufficiency::None;
    }
    if trail.node_ids.len() < min_nodes || trail.average_relevance() < min_relevance {
        return EvidenceSufficiency::Insufficient;
    }
    EvidenceSufficiency::Sufficient
}
