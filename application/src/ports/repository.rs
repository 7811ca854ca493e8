//! Port for durable council state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use council_domain::consensus::ConsensusRecord;
use council_domain::deliberation::{
    AgentInstance, AgentResponse, AuditEntry, Deliberation, DeliberationResult,
    DeliberationStatus, FlagDeliberationRequest,
};
use council_domain::evidence::EvidenceTrail;
use council_domain::health::AgentHealthStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("deliberation already completed: {0}")]
    AlreadyCompleted(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Filters and paging for deliberation listings.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub status: Option<DeliberationStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: usize,
    pub offset: usize,
}

/// One page of a deliberation listing.
#[derive(Debug, Clone)]
pub struct DeliberationPage {
    pub items: Vec<Deliberation>,
    pub total: usize,
}

/// Persistence for deliberations, responses, consensus records, evidence
/// trails, agent registrations and the audit log.
#[async_trait]
pub trait CouncilRepository: Send + Sync {
    async fn create_deliberation(&self, deliberation: &Deliberation)
        -> Result<(), RepositoryError>;

    async fn get_deliberation(&self, id: &str) -> Result<Deliberation, RepositoryError>;

    /// The deliberation plus every record attached to it.
    async fn get_deliberation_result(&self, id: &str)
        -> Result<DeliberationResult, RepositoryError>;

    /// Non-admin callers only see their own deliberations.
    async fn list_deliberations(
        &self,
        user_id: &str,
        is_admin: bool,
        opts: &ListOptions,
    ) -> Result<DeliberationPage, RepositoryError>;

    async fn update_deliberation_status(
        &self,
        id: &str,
        status: DeliberationStatus,
        final_response: Option<String>,
        confidence: Option<f64>,
        error_message: Option<String>,
    ) -> Result<(), RepositoryError>;

    /// Attach a user-visible flag to a completed deliberation.
    async fn flag_deliberation(
        &self,
        id: &str,
        user_id: &str,
        request: &FlagDeliberationRequest,
    ) -> Result<(), RepositoryError>;

    async fn create_agent_response(&self, response: &AgentResponse)
        -> Result<(), RepositoryError>;

    async fn get_agent_responses(
        &self,
        deliberation_id: &str,
    ) -> Result<Vec<AgentResponse>, RepositoryError>;

    async fn create_consensus_record(&self, record: &ConsensusRecord)
        -> Result<(), RepositoryError>;

    async fn get_consensus_record(
        &self,
        deliberation_id: &str,
    ) -> Result<ConsensusRecord, RepositoryError>;

    async fn create_evidence_trail(&self, trail: &EvidenceTrail) -> Result<(), RepositoryError>;

    async fn get_evidence_trail(
        &self,
        deliberation_id: &str,
    ) -> Result<EvidenceTrail, RepositoryError>;

    async fn register_agent_instance(&self, instance: &AgentInstance)
        -> Result<(), RepositoryError>;

    async fn list_healthy_agents(&self) -> Result<Vec<AgentInstance>, RepositoryError>;

    async fn update_agent_heartbeat(&self, agent_id: &str) -> Result<(), RepositoryError>;

    async fn update_agent_health(
        &self,
        agent_id: &str,
        status: AgentHealthStatus,
    ) -> Result<(), RepositoryError>;

    /// Audit entries are append-only; there is no update or delete.
    async fn create_audit_entry(&self, entry: &AuditEntry) -> Result<(), RepositoryError>;

    async fn get_audit_entries(
        &self,
        deliberation_id: &str,
    ) -> Result<Vec<AuditEntry>, RepositoryError>;
}
