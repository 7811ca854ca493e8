//! Persisted consensus types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cluster of semantically equivalent agent responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub group_id: usize,
    pub agent_ids: Vec<String>,
    /// Representative response text, selected from a member (never
    /// synthesized).
    pub canonical: String,
    /// Average pairwise similarity within the group.
    pub similarity: f64,
}

/// Result of consensus computation for a deliberation.
/// One-to-one with the deliberation; created once, immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusRecord {
    pub id: String,
    pub deliberation_id: String,
    /// Agreement score in [0, 100].
    pub agreement_score: f64,
    pub equivalence_groups: Vec<Group>,
    pub threshold_met: bool,
    pub dissenting_agents: Vec<String>,
    pub consensus_method: String,
    pub created_at: DateTime<Utc>,
}

impl ConsensusRecord {
    pub fn new(deliberation_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            deliberation_id: deliberation_id.into(),
            agreement_score: 0.0,
            equivalence_groups: Vec::new(),
            threshold_met: false,
            dissenting_agents: Vec::new(),
            consensus_method: String::new(),
            created_at: Utc::now(),
        }
    }
}
