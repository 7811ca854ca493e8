//! Evidence types - knowledge-graph grounding for deliberations.

pub mod cache_entry;
pub mod knowledge;
pub mod trail;

pub use cache_entry::{EvidenceCacheEntry, KgHealthStatus};
pub use knowledge::{EdgeType, KnowledgeGraphNode, NodeType};
pub use trail::{EvidenceSufficiency, EvidenceTrail, TraversalStep, assess_sufficiency};
