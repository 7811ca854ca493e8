//! The deliberation coordinator.
//!
//! Orchestrates one deliberation end to end: admission against the
//! health registry, concurrent fan-out to the council and the evidence
//! retriever, consensus calculation, persistence and audit. Evidence
//! retrieval degrades gracefully; persistence of secondary records is
//! best-effort and never fails the deliberation.

use std::sync::Arc;

use chrono::Utc;
use council_domain::DomainError;
use council_domain::consensus::{ConsensusCalculator, ConsensusRecord};
use council_domain::deliberation::{
    AgentResponse, AuditAction, AuditEntry, CreateDeliberationRequest, Deliberation,
    DeliberationResult, DeliberationStatus,
};
use council_domain::evidence::{
    EvidenceCacheEntry, EvidenceTrail, KgHealthStatus, assess_sufficiency,
};
use council_domain::semantic::SemanticDetector;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent_wrapper::AgentWrapper;
use crate::config::CouncilConfig;
use crate::evidence_retriever::EvidenceRetriever;
use crate::health_monitor::HealthMonitor;
use crate::ports::{
    Agent, CouncilRepository, EvidenceCache, KnowledgeGraphRepository, RepositoryError,
};

/// Knowledge-graph nodes fetched when deriving seeds from a response
/// embedding.
const SEED_SIMILAR_LIMIT: usize = 5;

#[derive(Error, Debug)]
pub enum DeliberateError {
    #[error("only {available} healthy agents available, {required} required")]
    InsufficientHealthyAgents { required: usize, available: usize },

    #[error("only {got} agent responses collected, {required} required")]
    InsufficientResponses { required: usize, got: usize },

    #[error(transparent)]
    Consensus(#[from] DomainError),

    #[error("failed to create deliberation: {0}")]
    Create(#[from] RepositoryError),
}

/// Runs deliberations across the council.
pub struct DeliberateUseCase<R, K, C> {
    repo: Arc<R>,
    kg: Arc<K>,
    cache: Arc<C>,
    agents: Vec<AgentWrapper>,
    monitor: HealthMonitor,
    calculator: ConsensusCalculator,
    retriever: EvidenceRetriever<K>,
    config: CouncilConfig,
}

impl<R, K, C> DeliberateUseCase<R, K, C>
where
    R: CouncilRepository,
    K: KnowledgeGraphRepository,
    C: EvidenceCache,
{
    pub fn new(
        agents: Vec<Arc<dyn Agent>>,
        repo: Arc<R>,
        kg: Arc<K>,
        cache: Arc<C>,
        config: CouncilConfig,
    ) -> Self {
        let monitor = HealthMonitor::new(config.health.clone(), config.sweep_interval);
        let wrappers = agents
            .into_iter()
            .map(|agent| {
                let instance = council_domain::deliberation::AgentInstance::new(
                    agent.id(),
                    agent.name(),
                    config.agent_timeout.as_secs(),
                );
                let health = monitor.register_agent(instance);
                AgentWrapper::new(agent, config.agent_timeout, health, monitor.clone())
            })
            .collect();
        let calculator =
            ConsensusCalculator::with_min_agents(config.consensus_threshold, config.min_agents)
                .with_detector(SemanticDetector::new(config.semantic_threshold));
        let retriever = EvidenceRetriever::new(
            Arc::clone(&kg),
            config.max_hops,
            config.cache_ttl,
            config.related_node_limit,
        );
        Self {
            repo,
            kg,
            cache,
            agents: wrappers,
            monitor,
            calculator,
            retriever,
            config,
        }
    }

    pub fn health_monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    /// Persist an instance row for every registered agent. Best-effort;
    /// call once at startup.
    pub async fn register_agent_instances(&self) {
        for instance in self.monitor.available_agents(Utc::now()) {
            if let Err(error) = self.repo.register_agent_instance(&instance).await {
                warn!(agent_id = %instance.id, %error, "failed to persist agent instance");
            }
        }
    }

    pub async fn execute(
        &self,
        request: CreateDeliberationRequest,
        user_id: &str,
    ) -> Result<DeliberationResult, DeliberateError> {
        self.execute_with_cancellation(request, user_id, CancellationToken::new())
            .await
    }

    /// Run a full deliberation. Cancelling the token aborts all
    /// in-flight agent queries; each cancelled query counts as a
    /// failure for that agent's circuit.
    pub async fn execute_with_cancellation(
        &self,
        request: CreateDeliberationRequest,
        user_id: &str,
        cancel: CancellationToken,
    ) -> Result<DeliberationResult, DeliberateError> {
        let started = std::time::Instant::now();
        let threshold = request
            .consensus_threshold
            .unwrap_or(self.config.consensus_threshold);
        let mut deliberation = Deliberation::new(&request.query, user_id, threshold);
        info!(
            deliberation_id = %deliberation.id,
            query_hash = %deliberation.query_hash,
            threshold,
            "deliberation started"
        );

        self.repo.create_deliberation(&deliberation).await?;
        deliberation.status = DeliberationStatus::Deliberating;
        if let Err(error) = self
            .repo
            .update_deliberation_status(
                &deliberation.id,
                DeliberationStatus::Deliberating,
                None,
                None,
                None,
            )
            .await
        {
            warn!(%error, "failed to mark deliberation as deliberating");
        }

        // Admission: enough agents must be eligible before any work starts.
        let eligible: Vec<AgentWrapper> = self
            .agents
            .iter()
            .filter(|wrapper| wrapper.can_accept_request())
            .cloned()
            .collect();
        if eligible.len() < self.config.min_agents {
            let message = format!(
                "only {} healthy agents available, {} required",
                eligible.len(),
                self.config.min_agents
            );
            self.fail(&deliberation.id, &message).await;
            return Err(DeliberateError::InsufficientHealthyAgents {
                required: self.config.min_agents,
                available: eligible.len(),
            });
        }

        // Agents and seeded evidence retrieval run concurrently; when
        // no seeds were supplied, evidence waits for the responses.
        let seeded_evidence = async {
            if request.seed_node_ids.is_empty() {
                None
            } else {
                self.gather_evidence(&deliberation.query_hash, &request.seed_node_ids)
                    .await
            }
        };
        let (mut responses, mut evidence) = tokio::join!(
            self.collect_responses(&deliberation.query_text, eligible, &cancel),
            seeded_evidence
        );

        if responses.len() < self.config.min_agents {
            let message = format!(
                "only {} agent responses collected, {} required",
                responses.len(),
                self.config.min_agents
            );
            self.fail(&deliberation.id, &message).await;
            return Err(DeliberateError::InsufficientResponses {
                required: self.config.min_agents,
                got: responses.len(),
            });
        }

        // Arrival order depends on task scheduling; sort so grouping
        // and scoring are deterministic for a given response set.
        responses.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        for response in &mut responses {
            response.deliberation_id = deliberation.id.clone();
        }
        for response in &responses {
            if let Err(error) = self.repo.create_agent_response(response).await {
                warn!(%error, agent_id = %response.agent_id, "failed to persist agent response");
            }
        }

        // A per-request threshold overrides the configured calculator.
        let calculator = if request.consensus_threshold.is_some() {
            ConsensusCalculator::with_min_agents(threshold, self.config.min_agents)
                .with_detector(SemanticDetector::new(self.config.semantic_threshold))
        } else {
            self.calculator.clone()
        };
        let outcome = match calculator.calculate(&responses) {
            Ok(outcome) => outcome,
            Err(error) => {
                self.fail(&deliberation.id, &error.to_string()).await;
                return Err(DeliberateError::Consensus(error));
            }
        };

        if evidence.is_none() && request.seed_node_ids.is_empty() {
            let seeds = self.derive_seed_nodes(&responses).await;
            evidence = self
                .gather_evidence(&deliberation.query_hash, &seeds)
                .await;
        }
        if let Some(trail) = evidence.as_mut() {
            trail.deliberation_id = deliberation.id.clone();
        }
        let sufficiency = assess_sufficiency(
            evidence.as_ref(),
            self.config.evidence_min_nodes,
            self.config.evidence_min_relevance,
        );

        let mut record = ConsensusRecord::new(&deliberation.id);
        record.agreement_score = outcome.agreement_score;
        record.equivalence_groups = outcome.equivalence_groups.clone();
        record.threshold_met = outcome.threshold_met;
        record.dissenting_agents = outcome.dissenting_agents.clone();
        record.consensus_method = outcome.method.clone();
        if let Err(error) = self.repo.create_consensus_record(&record).await {
            warn!(%error, "failed to persist consensus record");
        }
        if let Some(trail) = &evidence {
            if let Err(error) = self.repo.create_evidence_trail(trail).await {
                warn!(%error, "failed to persist evidence trail");
            }
        }

        let final_response = outcome
            .threshold_met
            .then(|| outcome.final_response.clone());
        let confidence = outcome.threshold_met.then_some(outcome.confidence_score);
        if let Err(error) = self
            .repo
            .update_deliberation_status(
                &deliberation.id,
                outcome.status,
                final_response.clone(),
                confidence,
                None,
            )
            .await
        {
            warn!(%error, "failed to persist deliberation outcome");
        }
        deliberation.status = outcome.status;
        deliberation.final_response = final_response;
        deliberation.confidence_score = confidence;
        deliberation.completed_at = Some(Utc::now());

        let duration_ms = started.elapsed().as_millis() as u64;
        let audit = AuditEntry::new(&deliberation.id, user_id, AuditAction::Query)
            .with_detail(
                "query_length",
                serde_json::json!(deliberation.query_text.len()),
            )
            .with_detail("agent_count", serde_json::json!(responses.len()))
            .with_detail(
                "consensus_score",
                serde_json::json!(outcome.agreement_score),
            )
            .with_detail(
                "evidence_node_count",
                serde_json::json!(evidence.as_ref().map_or(0, |t| t.node_ids.len())),
            )
            .with_detail(
                "evidence_sufficiency",
                serde_json::to_value(sufficiency).unwrap_or(serde_json::Value::Null),
            )
            .with_detail("duration_ms", serde_json::json!(duration_ms));
        if let Err(error) = self.repo.create_audit_entry(&audit).await {
            warn!(%error, "failed to persist audit entry");
        }

        info!(
            deliberation_id = %deliberation.id,
            status = %deliberation.status,
            agreement_score = outcome.agreement_score,
            duration_ms,
            "deliberation complete"
        );

        Ok(DeliberationResult {
            deliberation,
            consensus_record: Some(record),
            evidence_trail: evidence,
            agent_responses: responses,
        })
    }

    /// Fan the query out to every eligible agent and gather whatever
    /// answers arrive. Individual agent failures are logged, not
    /// propagated.
    async fn collect_responses(
        &self,
        query: &str,
        wrappers: Vec<AgentWrapper>,
        cancel: &CancellationToken,
    ) -> Vec<AgentResponse> {
        let mut join_set = JoinSet::new();
        for wrapper in wrappers {
            let query = query.to_string();
            let cancel = cancel.clone();
            join_set.spawn(async move {
                let agent_id = wrapper.agent_id().to_string();
                (agent_id, wrapper.query(&query, &cancel).await)
            });
        }

        let mut responses = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((agent_id, Ok(response))) => {
                    debug!(%agent_id, confidence = response.confidence, "agent responded");
                    responses.push(response);
                }
                Ok((agent_id, Err(error))) => {
                    warn!(%agent_id, %error, "agent query failed");
                }
                Err(error) => {
                    warn!(%error, "agent task panicked");
                }
            }
        }
        responses
    }

    /// Evidence with graceful degradation: fresh cache hit, else a live
    /// traversal (cached on success), else a trustworthy cached entry
    /// during a graph outage, else nothing.
    async fn gather_evidence(&self, query_hash: &str, seeds: &[String]) -> Option<EvidenceTrail> {
        let now = Utc::now();
        let cached = match self.cache.get(query_hash).await {
            Ok(cached) => cached,
            Err(error) => {
                warn!(%error, "evidence cache lookup failed");
                None
            }
        };
        if let Some(entry) = &cached {
            if !entry.is_expired(now) {
                debug!(query_hash, "evidence cache hit");
                return Some(entry.to_trail(""));
            }
        }

        if seeds.is_empty() {
            return None;
        }

        let kg_healthy = match self.kg.health_check().await {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "knowledge graph health check failed");
                false
            }
        };
        if kg_healthy {
            match self.retriever.retrieve(seeds, self.config.max_hops).await {
                Ok(trail) if !trail.node_ids.is_empty() => {
                    let entry = EvidenceCacheEntry::from_trail(
                        query_hash,
                        &trail,
                        KgHealthStatus::Healthy,
                        self.config.cache_ttl,
                        now,
                    );
                    if let Err(error) = self.cache.set(query_hash, entry).await {
                        warn!(%error, "failed to cache evidence trail");
                    }
                    return Some(trail);
                }
                Ok(_) => return None,
                Err(error) => {
                    warn!(%error, "evidence traversal failed");
                }
            }
        }

        // Outage path: a cached entry stands in only when the graph was
        // healthy at cache time and the entry has not expired.
        if let Some(entry) = cached {
            if entry.is_trustworthy_during_outage(Utc::now()) {
                warn!(query_hash, "serving cached evidence during knowledge graph outage");
                return Some(entry.to_trail(""));
            }
        }
        None
    }

    /// When the caller supplied no seed nodes, seed from the graph
    /// nodes most similar to the most confident embedded response.
    async fn derive_seed_nodes(&self, responses: &[AgentResponse]) -> Vec<String> {
        let Some(best) = responses
            .iter()
            .filter(|r| !r.embedding.is_empty())
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        else {
            return Vec::new();
        };
        match self.kg.find_similar(&best.embedding, SEED_SIMILAR_LIMIT).await {
            Ok(nodes) => nodes.into_iter().map(|n| n.id).collect(),
            Err(error) => {
                warn!(%error, "seed node derivation failed");
                Vec::new()
            }
        }
    }

    async fn fail(&self, deliberation_id: &str, message: &str) {
        warn!(deliberation_id, message, "deliberation failed");
        if let Err(error) = self
            .repo
            .update_deliberation_status(
                deliberation_id,
                DeliberationStatus::Failed,
                None,
                None,
                Some(message.to_string()),
            )
            .await
        {
            warn!(%error, deliberation_id, "failed to record deliberation failure");
        }
    }
}
