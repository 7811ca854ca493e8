//! Infrastructure layer for the council deliberation engine.
//!
//! Adapters implementing the application ports: in-memory persistence,
//! an in-memory knowledge graph, the evidence cache, scripted agent
//! backends, plus configuration loading and tracing setup.

pub mod agents;
pub mod cache;
pub mod config;
pub mod knowledge_graph;
pub mod observability;
pub mod repository;

pub use agents::ScriptedAgent;
pub use cache::InMemoryEvidenceCache;
pub use config::{ConfigLoader, FileConfig};
pub use knowledge_graph::InMemoryKnowledgeGraph;
pub use observability::init_tracing;
pub use repository::InMemoryCouncilRepository;
