//! Ports - capability interfaces the council consumes.
//!
//! Implementations (adapters) live in the infrastructure layer.

pub mod agent;
pub mod evidence_cache;
pub mod knowledge_graph;
pub mod repository;

pub use agent::{Agent, AgentError};
pub use evidence_cache::{CacheError, EvidenceCache};
pub use knowledge_graph::{KnowledgeGraphError, KnowledgeGraphRepository};
pub use repository::{CouncilRepository, DeliberationPage, ListOptions, RepositoryError};
