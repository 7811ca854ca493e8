//! Domain layer for council
//!
//! This crate contains the core deliberation logic: entities, the
//! consensus and semantic-equivalence algorithms, the per-agent health
//! state machine, and evidence types. It has no dependencies on
//! infrastructure or transport concerns, and no async code; every
//! computation here is pure and clock-injected.
//!
//! # Core Concepts
//!
//! - **Deliberation**: one query-processing session across the agent
//!   council, terminating in `consensus`, `uncertain`, or `failed`
//! - **Consensus**: confidence-weighted agreement among semantically
//!   grouped responses, against a configurable threshold
//! - **Evidence trail**: the knowledge-graph traversal grounding a
//!   response
//! - **Health**: per-agent circuit breaker and status tracking as one
//!   state object with two views

pub mod consensus;
pub mod core;
pub mod deliberation;
pub mod evidence;
pub mod health;
pub mod semantic;

// Re-export commonly used types
pub use consensus::{ConsensusCalculator, ConsensusRecord, ConsensusResult, Group};
pub use crate::core::{DomainError, defaults, hash_query};
pub use deliberation::{
    AgentInstance, AgentResponse, AuditAction, AuditEntry, CreateDeliberationRequest,
    Deliberation, DeliberationResult, DeliberationStatus, FlagDeliberationRequest,
};
pub use evidence::{
    EdgeType, EvidenceCacheEntry, EvidenceSufficiency, EvidenceTrail, KgHealthStatus,
    KnowledgeGraphNode, NodeType, TraversalStep, assess_sufficiency,
};
pub use health::{
    AgentHealthState, AgentHealthStatus, CircuitState, HealthConfig, HealthEvent, HealthMetrics,
};
pub use semantic::SemanticDetector;
