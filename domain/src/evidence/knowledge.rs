//! Knowledge-graph value types.
//!
//! The graph's storage engine is external; these are the shapes the
//! council consumes through the `KnowledgeGraphRepository` port.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type of a knowledge-graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Concept,
    Medication,
    Procedure,
    Condition,
    Organization,
}

/// Type of relationship between knowledge-graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    Treats,
    Causes,
    Contraindicates,
    RelatedTo,
    Subsumes,
    PartOf,
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EdgeType::Treats => "TREATS",
            EdgeType::Causes => "CAUSES",
            EdgeType::Contraindicates => "CONTRAINDICATES",
            EdgeType::RelatedTo => "RELATED_TO",
            EdgeType::Subsumes => "SUBSUMES",
            EdgeType::PartOf => "PART_OF",
        };
        write!(f, "{s}")
    }
}

/// A unit of verified knowledge in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeGraphNode {
    pub id: String,
    pub node_type: NodeType,
    pub concept: String,
    pub definition: String,
    /// Precomputed embedding; generation is external.
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    pub confidence: f64,
    pub last_verified: DateTime<Utc>,
    /// Ids of adjacent nodes, paired index-wise with `edge_types`.
    #[serde(default)]
    pub edges: Vec<String>,
    #[serde(default)]
    pub edge_types: Vec<EdgeType>,
}

impl KnowledgeGraphNode {
    pub fn new(id: impl Into<String>, node_type: NodeType, concept: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            concept: concept.into(),
            definition: String::new(),
            embedding: Vec::new(),
            source: String::new(),
            source_id: None,
            confidence: 1.0,
            last_verified: Utc::now(),
            edges: Vec::new(),
            edge_types: Vec::new(),
        }
    }

    pub fn with_edge(mut self, to: impl Into<String>, edge_type: EdgeType) -> Self {
        self.edges.push(to.into());
        self.edge_types.push(edge_type);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}
