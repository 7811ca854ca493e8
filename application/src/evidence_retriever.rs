//! Breadth-first evidence retrieval over the knowledge graph.
//!
//! Relevance decays linearly with distance from a seed: 1.0 at hop 0,
//! minus 0.2 per hop, floored at 0.0. A visited set makes traversal
//! terminate on cyclic graphs, and a node reached by multiple paths is
//! scored at its first (shortest) distance.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use council_domain::evidence::{EdgeType, EvidenceTrail, TraversalStep};
use tracing::{debug, warn};

use crate::ports::{KnowledgeGraphError, KnowledgeGraphRepository};

/// Relevance lost per traversal hop.
const HOP_DECAY: f64 = 0.2;

/// Weight recorded for every traversal step.
const STEP_WEIGHT: f64 = 0.8;

pub struct EvidenceRetriever<K> {
    kg: Arc<K>,
    max_hops: usize,
    ttl: chrono::Duration,
    related_limit: usize,
}

impl<K: KnowledgeGraphRepository> EvidenceRetriever<K> {
    pub fn new(kg: Arc<K>, max_hops: usize, ttl: chrono::Duration, related_limit: usize) -> Self {
        Self {
            kg,
            max_hops,
            ttl,
            related_limit,
        }
    }

    /// Traverse from the seed nodes with no edge-type filter.
    pub async fn retrieve(
        &self,
        seed_node_ids: &[String],
        max_hops: usize,
    ) -> Result<EvidenceTrail, KnowledgeGraphError> {
        self.retrieve_with_filters(seed_node_ids, max_hops, &[])
            .await
    }

    /// Traverse from the seed nodes, following only the given edge
    /// types (empty slice means all). `max_hops == 0` falls back to the
    /// configured default.
    pub async fn retrieve_with_filters(
        &self,
        seed_node_ids: &[String],
        max_hops: usize,
        edge_types: &[EdgeType],
    ) -> Result<EvidenceTrail, KnowledgeGraphError> {
        let max_hops = if max_hops == 0 { self.max_hops } else { max_hops };
        let mut trail = EvidenceTrail::new(max_hops, self.ttl);

        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, usize, Option<(String, EdgeType)>)> = seed_node_ids
            .iter()
            .map(|id| (id.clone(), 0, None))
            .collect();

        while let Some((node_id, hop, arrived_via)) = queue.pop_front() {
            if !visited.insert(node_id.clone()) {
                continue;
            }

            let relevance = (1.0 - HOP_DECAY * hop as f64).max(0.0);
            trail.node_ids.push(node_id.clone());
            trail.relevance_scores.insert(node_id.clone(), relevance);
            if let Some((from_node_id, edge_type)) = arrived_via {
                trail.traversal_path.push(TraversalStep {
                    from_node_id,
                    to_node_id: node_id.clone(),
                    edge_type,
                    weight: STEP_WEIGHT,
                });
            }

            if hop >= max_hops {
                continue;
            }
            let related = match self
                .kg
                .related_nodes(&node_id, edge_types, self.related_limit)
                .await
            {
                Ok(related) => related,
                Err(error) => {
                    // Partial trails are acceptable; skip the branch.
                    warn!(%node_id, %error, "neighbor lookup failed, skipping branch");
                    continue;
                }
            };
            for (neighbor, edge_type) in related {
                if !visited.contains(&neighbor.id) {
                    queue.push_back((neighbor.id, hop + 1, Some((node_id.clone(), edge_type))));
                }
            }
        }

        debug!(
            nodes = trail.node_ids.len(),
            steps = trail.traversal_path.len(),
            max_hops,
            "evidence traversal complete"
        );
        Ok(trail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use council_domain::evidence::{KnowledgeGraphNode, NodeType};
    use std::collections::HashMap;

    /// In-memory adjacency list standing in for the graph port.
    struct FakeGraph {
        edges: HashMap<String, Vec<(String, EdgeType)>>,
    }

    impl FakeGraph {
        fn new(edges: &[(&str, &str, EdgeType)]) -> Self {
            let mut map: HashMap<String, Vec<(String, EdgeType)>> = HashMap::new();
            for (from, to, edge_type) in edges {
                map.entry((*from).to_string())
                    .or_default()
                    .push(((*to).to_string(), *edge_type));
            }
            Self { edges: map }
        }

        fn node(id: &str) -> KnowledgeGraphNode {
            KnowledgeGraphNode::new(id, NodeType::Concept, id)
        }
    }

    #[async_trait]
    impl KnowledgeGraphRepository for FakeGraph {
        async fn get_node(&self, id: &str) -> Result<KnowledgeGraphNode, KnowledgeGraphError> {
            Ok(Self::node(id))
        }

        async fn get_nodes(
            &self,
            ids: &[String],
        ) -> Result<Vec<KnowledgeGraphNode>, KnowledgeGraphError> {
            Ok(ids.iter().map(|id| Self::node(id)).collect())
        }

        async fn related_nodes(
            &self,
            node_id: &str,
            edge_types: &[EdgeType],
            limit: usize,
        ) -> Result<Vec<(KnowledgeGraphNode, EdgeType)>, KnowledgeGraphError> {
            let mut related: Vec<(KnowledgeGraphNode, EdgeType)> = self
                .edges
                .get(node_id)
                .into_iter()
                .flatten()
                .filter(|(_, edge)| edge_types.is_empty() || edge_types.contains(edge))
                .map(|(to, edge)| (Self::node(to), *edge))
                .collect();
            related.truncate(limit);
            Ok(related)
        }

        async fn find_similar(
            &self,
            _embedding: &[f32],
            _limit: usize,
        ) -> Result<Vec<KnowledgeGraphNode>, KnowledgeGraphError> {
            Ok(Vec::new())
        }

        async fn health_check(&self) -> Result<(), KnowledgeGraphError> {
            Ok(())
        }
    }

    fn retriever(graph: FakeGraph) -> EvidenceRetriever<FakeGraph> {
        EvidenceRetriever::new(Arc::new(graph), 3, chrono::Duration::minutes(5), 16)
    }

    #[tokio::test]
    async fn test_relevance_decays_with_hops() {
        let graph = FakeGraph::new(&[
            ("a", "b", EdgeType::Treats),
            ("b", "c", EdgeType::Causes),
        ]);
        let trail = retriever(graph)
            .retrieve(&["a".to_string()], 3)
            .await
            .unwrap();

        assert_eq!(trail.node_ids, vec!["a", "b", "c"]);
        assert!((trail.relevance_scores["a"] - 1.0).abs() < 1e-9);
        assert!((trail.relevance_scores["b"] - 0.8).abs() < 1e-9);
        assert!((trail.relevance_scores["c"] - 0.6).abs() < 1e-9);
        assert_eq!(trail.traversal_path.len(), 2);
        assert_eq!(trail.traversal_path[0].edge_type, EdgeType::Treats);
    }

    #[tokio::test]
    async fn test_cyclic_graph_terminates_without_duplicates() {
        let graph = FakeGraph::new(&[
            ("a", "b", EdgeType::RelatedTo),
            ("b", "c", EdgeType::RelatedTo),
            ("c", "a", EdgeType::RelatedTo),
        ]);
        let trail = retriever(graph)
            .retrieve(&["a".to_string()], 10)
            .await
            .unwrap();

        assert_eq!(trail.node_ids.len(), 3);
        let unique: HashSet<&String> = trail.node_ids.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[tokio::test]
    async fn test_max_hops_bounds_traversal() {
        let graph = FakeGraph::new(&[
            ("a", "b", EdgeType::RelatedTo),
            ("b", "c", EdgeType::RelatedTo),
            ("c", "d", EdgeType::RelatedTo),
        ]);
        let trail = retriever(graph)
            .retrieve(&["a".to_string()], 1)
            .await
            .unwrap();
        assert_eq!(trail.node_ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_node_scored_at_shortest_distance() {
        // d is reachable at hop 1 (via a→d) and hop 2 (a→b→d).
        let graph = FakeGraph::new(&[
            ("a", "b", EdgeType::RelatedTo),
            ("a", "d", EdgeType::RelatedTo),
            ("b", "d", EdgeType::RelatedTo),
        ]);
        let trail = retriever(graph)
            .retrieve(&["a".to_string()], 3)
            .await
            .unwrap();
        assert!((trail.relevance_scores["d"] - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_edge_type_filter_restricts_expansion() {
        let graph = FakeGraph::new(&[
            ("a", "b", EdgeType::Treats),
            ("a", "c", EdgeType::Contraindicates),
        ]);
        let trail = retriever(graph)
            .retrieve_with_filters(&["a".to_string()], 3, &[EdgeType::Treats])
            .await
            .unwrap();
        assert_eq!(trail.node_ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_seeds_yield_empty_trail() {
        let graph = FakeGraph::new(&[]);
        let trail = retriever(graph).retrieve(&[], 3).await.unwrap();
        assert!(trail.node_ids.is_empty());
        assert!(trail.traversal_path.is_empty());
    }

    #[tokio::test]
    async fn test_deep_traversal_floors_relevance_at_zero() {
        let graph = FakeGraph::new(&[
            ("n0", "n1", EdgeType::RelatedTo),
            ("n1", "n2", EdgeType::RelatedTo),
            ("n2", "n3", EdgeType::RelatedTo),
            ("n3", "n4", EdgeType::RelatedTo),
            ("n4", "n5", EdgeType::RelatedTo),
            ("n5", "n6", EdgeType::RelatedTo),
        ]);
        let trail = retriever(graph)
            .retrieve(&["n0".to_string()], 6)
            .await
            .unwrap();
        assert!((trail.relevance_scores["n5"] - 0.0).abs() < 1e-9);
        assert!((trail.relevance_scores["n6"] - 0.0).abs() < 1e-9);
    }
}
