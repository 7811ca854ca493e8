//! Core entities for council deliberations.
//!
//! A [`Deliberation`] is one end-to-end query-processing session: the
//! query is fanned out to the council, responses are collected, and the
//! session terminates in exactly one of `consensus`, `uncertain`, or
//! `failed`. Terminal deliberations are immutable except for audit
//! references.

use crate::core::hash::hash_query;
use crate::health::AgentHealthStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Lifecycle state of a deliberation.
///
/// `Pending → Deliberating → {Consensus | Uncertain | Failed}`; the
/// transition into a terminal state happens exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliberationStatus {
    /// Query received, not yet processing
    Pending,
    /// Agents are analyzing
    Deliberating,
    /// Consensus reached
    Consensus,
    /// No consensus, uncertainty signaled
    Uncertain,
    /// Processing failed
    Failed,
}

impl DeliberationStatus {
    /// Check if this status is terminal (no further transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliberationStatus::Consensus
                | DeliberationStatus::Uncertain
                | DeliberationStatus::Failed
        )
    }
}

impl std::fmt::Display for DeliberationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeliberationStatus::Pending => "pending",
            DeliberationStatus::Deliberating => "deliberating",
            DeliberationStatus::Consensus => "consensus",
            DeliberationStatus::Uncertain => "uncertain",
            DeliberationStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A single query-processing session across the agent council.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deliberation {
    pub id: String,
    pub query_text: String,
    /// Deterministic SHA-256 digest of the query text, for deduplication.
    pub query_hash: String,
    pub user_id: String,
    pub status: DeliberationStatus,
    pub consensus_threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Deliberation {
    /// Create a new pending deliberation for a query.
    pub fn new(query: impl Into<String>, user_id: impl Into<String>, threshold: f64) -> Self {
        let query_text = query.into();
        Self {
            id: Uuid::new_v4().to_string(),
            query_hash: hash_query(&query_text),
            query_text,
            user_id: user_id.into(),
            status: DeliberationStatus::Pending,
            consensus_threshold: threshold,
            final_response: None,
            confidence_score: None,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// A registered reasoning unit in the council.
///
/// Long-lived (process lifetime). Health status is mutated only by the
/// health tracker; everyone else reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInstance {
    pub id: String,
    pub name: String,
    pub health_status: AgentHealthStatus,
    pub last_heartbeat: DateTime<Utc>,
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
    pub timeout_secs: u64,
    pub created_at: DateTime<Utc>,
}

impl AgentInstance {
    /// Create a healthy instance for a newly registered agent.
    pub fn new(id: impl Into<String>, name: impl Into<String>, timeout_secs: u64) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            health_status: AgentHealthStatus::Healthy,
            last_heartbeat: now,
            config: BTreeMap::new(),
            timeout_secs,
            created_at: now,
        }
    }
}

/// One agent's answer to one deliberation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub id: String,
    pub deliberation_id: String,
    pub agent_id: String,
    pub response_text: String,
    #[serde(default)]
    pub evidence_ids: Vec<String>,
    /// Confidence in the range 0-100.
    pub confidence: f64,
    /// Precomputed semantic embedding; generation is external.
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl AgentResponse {
    pub fn new(agent_id: impl Into<String>, text: impl Into<String>, confidence: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            deliberation_id: String::new(),
            agent_id: agent_id.into(),
            response_text: text.into(),
            evidence_ids: Vec::new(),
            confidence,
            embedding: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn with_evidence_ids(mut self, evidence_ids: Vec<String>) -> Self {
        self.evidence_ids = evidence_ids;
        self
    }
}

/// Action recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Query,
    Review,
    Flag,
    Export,
    Access,
}

/// Append-only compliance record of one action.
///
/// Never mutated or deleted after creation. The storage boundary must
/// reject UPDATE/DELETE at the engine level; the repository interface
/// deliberately has no update or delete operation for audit entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub deliberation_id: String,
    pub user_id: String,
    pub action: AuditAction,
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub partition_date: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        deliberation_id: impl Into<String>,
        user_id: impl Into<String>,
        action: AuditAction,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            deliberation_id: deliberation_id.into(),
            user_id: user_id.into(),
            action,
            details: BTreeMap::new(),
            ip_address: None,
            created_at: now,
            partition_date: now,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

/// Request to create a new deliberation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDeliberationRequest {
    pub query: String,
    /// Overrides the configured consensus threshold when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consensus_threshold: Option<f64>,
    /// Seed concept node ids for evidence retrieval, when the caller
    /// already knows the relevant knowledge-graph entry points.
    #[serde(default)]
    pub seed_node_ids: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl CreateDeliberationRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.consensus_threshold = Some(threshold);
        self
    }

    pub fn with_seed_nodes(mut self, seed_node_ids: Vec<String>) -> Self {
        self.seed_node_ids = seed_node_ids;
        self
    }
}

/// Request to flag a deliberation for review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagDeliberationRequest {
    pub reason: String,
    /// factual_error, fabricated_data, misleading_context, other
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hallucination_type: Option<String>,
    /// low, medium, high, critical
    pub severity: String,
}

/// Complete outcome of a deliberation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliberationResult {
    pub deliberation: Deliberation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consensus_record: Option<crate::consensus::ConsensusRecord>,
    /// Absent when evidence retrieval degraded gracefully.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_trail: Option<crate::evidence::EvidenceTrail>,
    #[serde(default)]
    pub agent_responses: Vec<AgentResponse>,
}
