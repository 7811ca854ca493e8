//! In-memory implementation of the council repository.
//!
//! Backs development and testing; a production deployment would swap in
//! a database-backed adapter behind the same port. Semantics match the
//! port contract: terminal deliberations reject further status updates,
//! and the audit log is append-only with no update or delete path.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use council_application::ports::{
    CouncilRepository, DeliberationPage, ListOptions, RepositoryError,
};
use council_domain::consensus::ConsensusRecord;
use council_domain::deliberation::{
    AgentInstance, AgentResponse, AuditEntry, Deliberation, DeliberationResult,
    DeliberationStatus, FlagDeliberationRequest,
};
use council_domain::evidence::EvidenceTrail;
use council_domain::health::AgentHealthStatus;
use tokio::sync::RwLock;

/// A recorded review flag on a deliberation.
#[derive(Debug, Clone)]
pub struct FlagRecord {
    pub user_id: String,
    pub request: FlagDeliberationRequest,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Default)]
struct Store {
    deliberations: HashMap<String, Deliberation>,
    responses: HashMap<String, Vec<AgentResponse>>,
    consensus: HashMap<String, ConsensusRecord>,
    trails: HashMap<String, EvidenceTrail>,
    agents: HashMap<String, AgentInstance>,
    flags: HashMap<String, Vec<FlagRecord>>,
    audit: Vec<AuditEntry>,
}

/// Thread-safe in-memory store for all council records.
#[derive(Default)]
pub struct InMemoryCouncilRepository {
    store: RwLock<Store>,
}

impl InMemoryCouncilRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of flags attached to a deliberation.
    pub async fn flag_count(&self, deliberation_id: &str) -> usize {
        self.store
            .read()
            .await
            .flags
            .get(deliberation_id)
            .map_or(0, Vec::len)
    }

    /// All flags attached to a deliberation, oldest first.
    pub async fn flags_for(&self, deliberation_id: &str) -> Vec<FlagRecord> {
        self.store
            .read()
            .await
            .flags
            .get(deliberation_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CouncilRepository for InMemoryCouncilRepository {
    async fn create_deliberation(
        &self,
        deliberation: &Deliberation,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        if store.deliberations.contains_key(&deliberation.id) {
            return Err(RepositoryError::Storage(format!(
                "duplicate deliberation id {}",
                deliberation.id
            )));
        }
        store
            .deliberations
            .insert(deliberation.id.clone(), deliberation.clone());
        Ok(())
    }

    async fn get_deliberation(&self, id: &str) -> Result<Deliberation, RepositoryError> {
        self.store
            .read()
            .await
            .deliberations
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn get_deliberation_result(
        &self,
        id: &str,
    ) -> Result<DeliberationResult, RepositoryError> {
        let store = self.store.read().await;
        let deliberation = store
            .deliberations
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        Ok(DeliberationResult {
            deliberation,
            consensus_record: store.consensus.get(id).cloned(),
            evidence_trail: store.trails.get(id).cloned(),
            agent_responses: store.responses.get(id).cloned().unwrap_or_default(),
        })
    }

    async fn list_deliberations(
        &self,
        user_id: &str,
        is_admin: bool,
        opts: &ListOptions,
    ) -> Result<DeliberationPage, RepositoryError> {
        let store = self.store.read().await;
        let mut items: Vec<Deliberation> = store
            .deliberations
            .values()
            .filter(|d| is_admin || d.user_id == user_id)
            .filter(|d| opts.status.is_none_or(|s| d.status == s))
            .filter(|d| opts.from.is_none_or(|from| d.created_at >= from))
            .filter(|d| opts.to.is_none_or(|to| d.created_at <= to))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = items.len();
        let items: Vec<Deliberation> = items
            .into_iter()
            .skip(opts.offset)
            .take(if opts.limit == 0 { usize::MAX } else { opts.limit })
            .collect();
        Ok(DeliberationPage { items, total })
    }

    async fn update_deliberation_status(
        &self,
        id: &str,
        status: DeliberationStatus,
        final_response: Option<String>,
        confidence: Option<f64>,
        error_message: Option<String>,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        let deliberation = store
            .deliberations
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        if deliberation.status.is_terminal() {
            return Err(RepositoryError::AlreadyCompleted(id.to_string()));
        }
        deliberation.status = status;
        deliberation.final_response = final_response;
        deliberation.confidence_score = confidence;
        deliberation.error_message = error_message;
        if status.is_terminal() {
            deliberation.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn flag_deliberation(
        &self,
        id: &str,
        user_id: &str,
        request: &FlagDeliberationRequest,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        if !store.deliberations.contains_key(id) {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        store.flags.entry(id.to_string()).or_default().push(FlagRecord {
            user_id: user_id.to_string(),
            request: request.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn create_agent_response(
        &self,
        response: &AgentResponse,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        store
            .responses
            .entry(response.deliberation_id.clone())
            .or_default()
            .push(response.clone());
        Ok(())
    }

    async fn get_agent_responses(
        &self,
        deliberation_id: &str,
    ) -> Result<Vec<AgentResponse>, RepositoryError> {
        Ok(self
            .store
            .read()
            .await
            .responses
            .get(deliberation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_consensus_record(
        &self,
        record: &ConsensusRecord,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        if store.consensus.contains_key(&record.deliberation_id) {
            return Err(RepositoryError::Storage(format!(
                "consensus record already exists for {}",
                record.deliberation_id
            )));
        }
        store
            .consensus
            .insert(record.deliberation_id.clone(), record.clone());
        Ok(())
    }

    async fn get_consensus_record(
        &self,
        deliberation_id: &str,
    ) -> Result<ConsensusRecord, RepositoryError> {
        self.store
            .read()
            .await
            .consensus
            .get(deliberation_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(deliberation_id.to_string()))
    }

    async fn create_evidence_trail(&self, trail: &EvidenceTrail) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        store
            .trails
            .insert(trail.deliberation_id.clone(), trail.clone());
        Ok(())
    }

    async fn get_evidence_trail(
        &self,
        deliberation_id: &str,
    ) -> Result<EvidenceTrail, RepositoryError> {
        self.store
            .read()
            .await
            .trails
            .get(deliberation_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(deliberation_id.to_string()))
    }

    async fn register_agent_instance(
        &self,
        instance: &AgentInstance,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        store.agents.insert(instance.id.clone(), instance.clone());
        Ok(())
    }

    async fn list_healthy_agents(&self) -> Result<Vec<AgentInstance>, RepositoryError> {
        let store = self.store.read().await;
        let mut agents: Vec<AgentInstance> = store
            .agents
            .values()
            .filter(|a| a.health_status == AgentHealthStatus::Healthy)
            .cloned()
            .collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }

    async fn update_agent_heartbeat(&self, agent_id: &str) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        let agent = store
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| RepositoryError::NotFound(agent_id.to_string()))?;
        agent.last_heartbeat = Utc::now();
        Ok(())
    }

    async fn update_agent_health(
        &self,
        agent_id: &str,
        status: AgentHealthStatus,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        let agent = store
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| RepositoryError::NotFound(agent_id.to_string()))?;
        agent.health_status = status;
        Ok(())
    }

    async fn create_audit_entry(&self, entry: &AuditEntry) -> Result<(), RepositoryError> {
        self.store.write().await.audit.push(entry.clone());
        Ok(())
    }

    async fn get_audit_entries(
        &self,
        deliberation_id: &str,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        Ok(self
            .store
            .read()
            .await
            .audit
            .iter()
            .filter(|e| e.deliberation_id == deliberation_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deliberation(user: &str) -> Deliberation {
        Deliberation::new("what treats hypertension?", user, 0.80)
    }

    #[tokio::test]
    async fn test_terminal_deliberation_rejects_updates() {
        let repo = InMemoryCouncilRepository::new();
        let d = deliberation("u1");
        repo.create_deliberation(&d).await.unwrap();
        repo.update_deliberation_status(&d.id, DeliberationStatus::Consensus, None, None, None)
            .await
            .unwrap();

        let err = repo
            .update_deliberation_status(&d.id, DeliberationStatus::Failed, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyCompleted(_)));
    }

    #[tokio::test]
    async fn test_duplicate_deliberation_id_rejected() {
        let repo = InMemoryCouncilRepository::new();
        let d = deliberation("u1");
        repo.create_deliberation(&d).await.unwrap();
        assert!(repo.create_deliberation(&d).await.is_err());
    }

    #[tokio::test]
    async fn test_listing_scopes_to_owner_unless_admin() {
        let repo = InMemoryCouncilRepository::new();
        repo.create_deliberation(&deliberation("alice")).await.unwrap();
        repo.create_deliberation(&deliberation("bob")).await.unwrap();

        let opts = ListOptions::default();
        let page = repo.list_deliberations("alice", false, &opts).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].user_id, "alice");

        let page = repo.list_deliberations("alice", true, &opts).await.unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_listing_filters_and_pages() {
        let repo = InMemoryCouncilRepository::new();
        for _ in 0..5 {
            repo.create_deliberation(&deliberation("u1")).await.unwrap();
        }
        let opts = ListOptions {
            status: Some(DeliberationStatus::Pending),
            limit: 2,
            offset: 2,
            ..ListOptions::default()
        };
        let page = repo.list_deliberations("u1", false, &opts).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
    }

    #[tokio::test]
    async fn test_consensus_record_is_write_once() {
        let repo = InMemoryCouncilRepository::new();
        let record = ConsensusRecord::new("d-1");
        repo.create_consensus_record(&record).await.unwrap();
        assert!(repo.create_consensus_record(&record).await.is_err());
    }

    #[tokio::test]
    async fn test_flagging_requires_existing_deliberation() {
        let repo = InMemoryCouncilRepository::new();
        let request = FlagDeliberationRequest {
            reason: "looks fabricated".to_string(),
            hallucination_type: Some("fabricated_data".to_string()),
            severity: "high".to_string(),
        };
        assert!(repo.flag_deliberation("missing", "u1", &request).await.is_err());

        let d = deliberation("u1");
        repo.create_deliberation(&d).await.unwrap();
        repo.flag_deliberation(&d.id, "u1", &request).await.unwrap();
        assert_eq!(repo.flag_count(&d.id).await, 1);
        let flags = repo.flags_for(&d.id).await;
        assert_eq!(flags[0].user_id, "u1");
        assert_eq!(flags[0].request.severity, "high");
    }
}
