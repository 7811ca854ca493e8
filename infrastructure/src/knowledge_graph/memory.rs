//! In-memory knowledge graph adapter.
//!
//! Stores nodes with their outgoing edges and answers neighbor and
//! similarity queries over them. Availability can be toggled to
//! exercise the council's outage behavior.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use council_application::ports::{KnowledgeGraphError, KnowledgeGraphRepository};
use council_domain::evidence::{EdgeType, KnowledgeGraphNode};
use council_domain::semantic::SemanticDetector;
use tokio::sync::RwLock;

pub struct InMemoryKnowledgeGraph {
    nodes: RwLock<HashMap<String, KnowledgeGraphNode>>,
    available: AtomicBool,
}

impl Default for InMemoryKnowledgeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryKnowledgeGraph {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub async fn insert(&self, node: KnowledgeGraphNode) {
        self.nodes.write().await.insert(node.id.clone(), node);
    }

    pub async fn insert_all(&self, nodes: impl IntoIterator<Item = KnowledgeGraphNode>) {
        let mut store = self.nodes.write().await;
        for node in nodes {
            store.insert(node.id.clone(), node);
        }
    }

    /// Simulate an outage (or recovery) of the backing graph store.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), KnowledgeGraphError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(KnowledgeGraphError::Unavailable(
                "graph store offline".to_string(),
            ))
        }
    }
}

#[async_trait]
impl KnowledgeGraphRepository for InMemoryKnowledgeGraph {
    async fn get_node(&self, id: &str) -> Result<KnowledgeGraphNode, KnowledgeGraphError> {
        self.ensure_available()?;
        self.nodes
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| KnowledgeGraphError::NodeNotFound(id.to_string()))
    }

    async fn get_nodes(
        &self,
        ids: &[String],
    ) -> Result<Vec<KnowledgeGraphNode>, KnowledgeGraphError> {
        self.ensure_available()?;
        let nodes = self.nodes.read().await;
        Ok(ids.iter().filter_map(|id| nodes.get(id).cloned()).collect())
    }

    async fn related_nodes(
        &self,
        node_id: &str,
        edge_types: &[EdgeType],
        limit: usize,
    ) -> Result<Vec<(KnowledgeGraphNode, EdgeType)>, KnowledgeGraphError> {
        self.ensure_available()?;
        let nodes = self.nodes.read().await;
        let Some(node) = nodes.get(node_id) else {
            return Err(KnowledgeGraphError::NodeNotFound(node_id.to_string()));
        };

        let mut related = Vec::new();
        for (neighbor_id, edge_type) in node.edges.iter().zip(node.edge_types.iter()) {
            if !edge_types.is_empty() && !edge_types.contains(edge_type) {
                continue;
            }
            if let Some(neighbor) = nodes.get(neighbor_id) {
                related.push((neighbor.clone(), *edge_type));
            }
            if related.len() >= limit {
                break;
            }
        }
        Ok(related)
    }

    async fn find_similar(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<KnowledgeGraphNode>, KnowledgeGraphError> {
        self.ensure_available()?;
        let nodes = self.nodes.read().await;
        let mut scored: Vec<(f64, KnowledgeGraphNode)> = nodes
            .values()
            .filter(|node| !node.embedding.is_empty())
            .filter_map(|node| {
                SemanticDetector::cosine_similarity(embedding, &node.embedding)
                    .ok()
                    .map(|score| (score, node.clone()))
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().take(limit).map(|(_, node)| node).collect())
    }

    async fn health_check(&self) -> Result<(), KnowledgeGraphError> {
        self.ensure_available()
    }
}
