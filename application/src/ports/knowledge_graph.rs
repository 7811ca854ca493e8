//! Port for the knowledge graph used to ground deliberations.

use async_trait::async_trait;
use council_domain::evidence::{EdgeType, KnowledgeGraphNode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KnowledgeGraphError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("knowledge graph unavailable: {0}")]
    Unavailable(String),

    #[error("knowledge graph query failed: {0}")]
    QueryFailed(String),
}

/// Read access to the knowledge graph.
///
/// Traversal itself is driven by the evidence retriever; the port only
/// exposes single-hop neighbor lookups and similarity search.
#[async_trait]
pub trait KnowledgeGraphRepository: Send + Sync {
    async fn get_node(&self, id: &str) -> Result<KnowledgeGraphNode, KnowledgeGraphError>;

    async fn get_nodes(
        &self,
        ids: &[String],
    ) -> Result<Vec<KnowledgeGraphNode>, KnowledgeGraphError>;

    /// Neighbors of a node, paired with the edge type that connects them.
    /// An empty `edge_types` slice means no filter.
    async fn related_nodes(
        &self,
        node_id: &str,
        edge_types: &[EdgeType],
        limit: usize,
    ) -> Result<Vec<(KnowledgeGraphNode, EdgeType)>, KnowledgeGraphError>;

    /// Nodes whose embeddings are closest to the given one.
    async fn find_similar(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<KnowledgeGraphNode>, KnowledgeGraphError>;

    /// Cheap liveness probe, used to decide whether cached evidence
    /// must stand in for a fresh traversal.
    async fn health_check(&self) -> Result<(), KnowledgeGraphError>;
}
