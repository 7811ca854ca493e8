//! Equivalence detection via cosine similarity over precomputed
//! embeddings.
//!
//! Grouping is a greedy single pass in input order: each response joins
//! the first existing group whose founding member clears the similarity
//! threshold, otherwise it founds a new group. This is deliberately not
//! transitive (A~B and B~C does not imply A joins C's group under the
//! pairwise test); consensus-threshold calibration assumes the greedy
//! behavior, so replacing it with connected components or centroid
//! clustering is a behavior change, not a fix.

use crate::consensus::Group;
use crate::core::defaults;
use crate::core::error::DomainError;
use crate::deliberation::AgentResponse;

/// Semantic equivalence detector for agent responses.
#[derive(Debug, Clone)]
pub struct SemanticDetector {
    threshold: f64,
}

impl SemanticDetector {
    /// Create a detector; thresholds outside (0, 1] fall back to the
    /// default 0.95.
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold <= 0.0 || threshold > 1.0 {
            defaults::SEMANTIC_THRESHOLD
        } else {
            threshold
        };
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Cosine similarity between two embedding vectors.
    ///
    /// Errors on empty or dimension-mismatched inputs; returns 0.0 when
    /// either vector has zero magnitude.
    pub fn cosine_similarity(e1: &[f32], e2: &[f32]) -> Result<f64, DomainError> {
        if e1.is_empty() || e2.is_empty() {
            return Err(DomainError::EmptyEmbedding);
        }
        if e1.len() != e2.len() {
            return Err(DomainError::DimensionMismatch {
                left: e1.len(),
                right: e2.len(),
            });
        }

        let mut dot = 0.0f64;
        let mut norm1 = 0.0f64;
        let mut norm2 = 0.0f64;
        for (a, b) in e1.iter().zip(e2) {
            dot += f64::from(*a) * f64::from(*b);
            norm1 += f64::from(*a) * f64::from(*a);
            norm2 += f64::from(*b) * f64::from(*b);
        }

        if norm1 == 0.0 || norm2 == 0.0 {
            return Ok(0.0);
        }
        Ok(dot / (norm1.sqrt() * norm2.sqrt()))
    }

    /// Whether two embeddings clear the equivalence threshold.
    /// Unreadable pairs (empty, mismatched) are never equivalent.
    pub fn is_equivalent(&self, e1: &[f32], e2: &[f32]) -> bool {
        Self::cosine_similarity(e1, e2)
            .map(|sim| sim >= self.threshold)
            .unwrap_or(false)
    }

    /// Partition responses into equivalence groups.
    ///
    /// Responses are visited in input order; each joins the first group
    /// whose founding member is equivalent, otherwise starts a new
    /// group. The canonical text is the highest-confidence member's
    /// (first seen wins ties), selected rather than synthesized. Groups
    /// come back largest-first with stable ties.
    pub fn group_equivalent_responses(&self, responses: &[AgentResponse]) -> Vec<Group> {
        if responses.is_empty() {
            return Vec::new();
        }

        // member lists hold indices into `responses`; index 0 of each
        // list is the founding member
        let mut members: Vec<Vec<usize>> = Vec::new();

        for (idx, response) in responses.iter().enumerate() {
            let joined = members.iter_mut().find(|group| {
                let founder = &responses[group[0]];
                self.is_equivalent(&founder.embedding, &response.embedding)
            });
            match joined {
                Some(group) => group.push(idx),
                None => members.push(vec![idx]),
            }
        }

        let mut groups: Vec<Group> = members
            .iter()
            .enumerate()
            .map(|(group_idx, indices)| {
                let canonical_idx = indices
                    .iter()
                    .copied()
                    .max_by(|a, b| {
                        responses[*a]
                            .confidence
                            .partial_cmp(&responses[*b].confidence)
                            .unwrap_or(std::cmp::Ordering::Equal)
                            // first-seen wins ties: prefer the earlier index
                            .then(b.cmp(a))
                    })
                    .unwrap_or(indices[0]);

                Group {
                    group_id: group_idx + 1,
                    agent_ids: indices.iter().map(|i| responses[*i].agent_id.clone()).collect(),
                    canonical: responses[canonical_idx].response_text.clone(),
                    similarity: self.average_pairwise_similarity(indices, responses),
                }
            })
            .collect();

        groups.sort_by_key(|g| std::cmp::Reverse(g.agent_ids.len()));
        groups
    }

    /// Average pairwise similarity among group members; 1.0 for
    /// singletons and for unreadable pairs.
    fn average_pairwise_similarity(&self, indices: &[usize], responses: &[AgentResponse]) -> f64 {
        if indices.len() < 2 {
            return 1.0;
        }

        let mut sum = 0.0;
        let mut count = 0u32;
        for (i, a) in indices.iter().enumerate() {
            for b in &indices[i + 1..] {
                if let Ok(sim) = Self::cosine_similarity(
                    &responses[*a].embedding,
                    &responses[*b].embedding,
                ) {
                    sum += sim;
                    count += 1;
                }
            }
        }

        if count == 0 { 1.0 } else { sum / f64::from(count) }
    }
}

impl Default for SemanticDetector {
    fn default() -> Self {
        Self::new(defaults::SEMANTIC_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(agent: &str, text: &str, confidence: f64, embedding: Vec<f32>) -> AgentResponse {
        AgentResponse::new(agent, text, confidence).with_embedding(embedding)
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let sim = SemanticDetector::cosine_similarity(&[1.0, 0.0, 2.0], &[1.0, 0.0, 2.0]).unwrap();
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let sim = SemanticDetector::cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(sim.abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_empty_errors() {
        assert!(matches!(
            SemanticDetector::cosine_similarity(&[], &[1.0]),
            Err(DomainError::EmptyEmbedding)
        ));
    }

    #[test]
    fn test_cosine_similarity_dimension_mismatch_errors() {
        assert!(matches!(
            SemanticDetector::cosine_similarity(&[1.0], &[1.0, 2.0]),
            Err(DomainError::DimensionMismatch { left: 1, right: 2 })
        ));
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let sim = SemanticDetector::cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_group_empty_input() {
        let detector = SemanticDetector::default();
        assert!(detector.group_equivalent_responses(&[]).is_empty());
    }

    #[test]
    fn test_group_single_response_is_singleton() {
        let detector = SemanticDetector::default();
        let responses = vec![response("a", "take aspirin", 90.0, vec![1.0, 0.0])];

        let groups = detector.group_equivalent_responses(&responses);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].agent_ids, vec!["a"]);
        assert_eq!(groups[0].canonical, "take aspirin");
        assert_eq!(groups[0].similarity, 1.0);
    }

    #[test]
    fn test_group_all_equivalent_forms_one_group() {
        let detector = SemanticDetector::default();
        let responses = vec![
            response("a", "answer one", 80.0, vec![1.0, 0.0, 0.0]),
            response("b", "answer two", 95.0, vec![1.0, 0.0, 0.0]),
            response("c", "answer three", 70.0, vec![1.0, 0.0, 0.0]),
        ];

        let groups = detector.group_equivalent_responses(&responses);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].agent_ids.len(), 3);
        // Canonical comes from the highest-confidence member.
        assert_eq!(groups[0].canonical, "answer two");
    }

    #[test]
    fn test_group_dissenters_split_off() {
        let detector = SemanticDetector::default();
        let responses = vec![
            response("a", "yes", 90.0, vec![1.0, 0.0]),
            response("b", "yes", 85.0, vec![1.0, 0.0]),
            response("c", "no", 99.0, vec![0.0, 1.0]),
        ];

        let groups = detector.group_equivalent_responses(&responses);
        assert_eq!(groups.len(), 2);
        // Largest group first.
        assert_eq!(groups[0].agent_ids, vec!["a", "b"]);
        assert_eq!(groups[1].agent_ids, vec!["c"]);
    }

    #[test]
    fn test_canonical_tie_breaks_to_first_seen() {
        let detector = SemanticDetector::default();
        let responses = vec![
            response("a", "first text", 90.0, vec![1.0, 0.0]),
            response("b", "second text", 90.0, vec![1.0, 0.0]),
        ];

        let groups = detector.group_equivalent_responses(&responses);
        assert_eq!(groups[0].canonical, "first text");
    }

    #[test]
    fn test_grouping_compares_against_founding_member() {
        // b is equivalent to founder a; c is equivalent to b but not to
        // a, so the greedy founder comparison puts c in its own group.
        let detector = SemanticDetector::new(0.95);
        let e_a = vec![1.0, 0.0];
        let e_b = vec![0.98, 0.199]; // ~0.98 similar to a
        let e_c = vec![0.92, 0.392]; // ~0.96 similar to b, ~0.92 to a

        let responses = vec![
            response("a", "a", 90.0, e_a),
            response("b", "b", 90.0, e_b),
            response("c", "c", 90.0, e_c),
        ];

        let groups = detector.group_equivalent_responses(&responses);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].agent_ids, vec!["a", "b"]);
        assert_eq!(groups[1].agent_ids, vec!["c"]);
    }

    #[test]
    fn test_missing_embeddings_never_group() {
        let detector = SemanticDetector::default();
        let responses = vec![
            response("a", "text", 90.0, vec![]),
            response("b", "text", 90.0, vec![]),
        ];

        let groups = detector.group_equivalent_responses(&responses);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_out_of_range_threshold_falls_back_to_default() {
        assert_eq!(SemanticDetector::new(0.0).threshold(), 0.95);
        assert_eq!(SemanticDetector::new(1.5).threshold(), 0.95);
        assert_eq!(SemanticDetector::new(0.9).threshold(), 0.9);
    }
}
