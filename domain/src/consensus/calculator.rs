//! Confidence-weighted consensus over equivalence groups.
//!
//! The largest equivalence group is the presumptive consensus; each
//! response votes with weight `confidence / 100`. Weighting by
//! confidence rather than raw majority is a policy choice: a few
//! highly-confident agents can out-vote more numerous low-confidence
//! dissenters.

use super::record::Group;
use crate::core::defaults;
use crate::core::error::DomainError;
use crate::deliberation::{AgentResponse, DeliberationStatus};
use crate::semantic::SemanticDetector;

/// Method tag recorded on every consensus record.
const METHOD_WEIGHTED_VOTE: &str = "weighted_vote";

/// Outcome of consensus calculation.
#[derive(Debug, Clone)]
pub struct ConsensusResult {
    /// Agreement score in [0, 100].
    pub agreement_score: f64,
    pub threshold_met: bool,
    pub status: DeliberationStatus,
    /// Canonical text of the winning group; empty when uncertain.
    pub final_response: String,
    /// Mean confidence of the winning group's members; 0 when uncertain.
    pub confidence_score: f64,
    pub equivalence_groups: Vec<Group>,
    pub dissenting_agents: Vec<String>,
    pub method: String,
}

/// Calculates consensus from agent responses.
#[derive(Debug, Clone)]
pub struct ConsensusCalculator {
    threshold: f64,
    min_agents: usize,
    detector: SemanticDetector,
}

impl ConsensusCalculator {
    /// Create a calculator; thresholds outside (0, 1] fall back to the
    /// default 0.80.
    pub fn new(threshold: f64) -> Self {
        Self::with_min_agents(threshold, defaults::MIN_AGENTS)
    }

    pub fn with_min_agents(threshold: f64, min_agents: usize) -> Self {
        let threshold = if threshold <= 0.0 || threshold > 1.0 {
            defaults::CONSENSUS_THRESHOLD
        } else {
            threshold
        };
        Self {
            threshold,
            min_agents,
            detector: SemanticDetector::default(),
        }
    }

    pub fn with_detector(mut self, detector: SemanticDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Calculate consensus from agent responses.
    ///
    /// Errors when fewer than the minimum number of responses survived
    /// collection; a quorum below the minimum cannot produce a
    /// trustworthy agreement score.
    pub fn calculate(&self, responses: &[AgentResponse]) -> Result<ConsensusResult, DomainError> {
        if responses.len() < self.min_agents {
            return Err(DomainError::MinimumAgents {
                required: self.min_agents,
                got: responses.len(),
            });
        }

        let groups = self.detector.group_equivalent_responses(responses);

        // Reachable when min_agents is configured at 0 and no responses
        // arrived: no groups means no consensus, not a panic.
        if groups.is_empty() {
            return Ok(ConsensusResult {
                agreement_score: 0.0,
                threshold_met: false,
                status: DeliberationStatus::Uncertain,
                final_response: String::new(),
                confidence_score: 0.0,
                equivalence_groups: groups,
                dissenting_agents: Vec::new(),
                method: METHOD_WEIGHTED_VOTE.to_string(),
            });
        }

        // group_equivalent_responses returns largest-first
        let largest = &groups[0];

        let mut total_weight = 0.0;
        let mut consensus_weight = 0.0;
        let mut dissenting_agents = Vec::new();

        for response in responses {
            let weight = response.confidence / 100.0;
            total_weight += weight;

            if largest.agent_ids.iter().any(|id| *id == response.agent_id) {
                consensus_weight += weight;
            } else {
                dissenting_agents.push(response.agent_id.clone());
            }
        }

        let agreement_score = if total_weight > 0.0 {
            (consensus_weight / total_weight) * 100.0
        } else {
            0.0
        };

        let threshold_met = agreement_score >= self.threshold * 100.0;

        let (status, final_response, confidence_score) = if threshold_met {
            (
                DeliberationStatus::Consensus,
                largest.canonical.clone(),
                Self::group_mean_confidence(largest, responses),
            )
        } else {
            (DeliberationStatus::Uncertain, String::new(), 0.0)
        };

        Ok(ConsensusResult {
            agreement_score,
            threshold_met,
            status,
            final_response,
            confidence_score,
            equivalence_groups: groups,
            dissenting_agents,
            method: METHOD_WEIGHTED_VOTE.to_string(),
        })
    }

    /// Arithmetic mean of the confidences of a group's members.
    fn group_mean_confidence(group: &Group, responses: &[AgentResponse]) -> f64 {
        let mut total = 0.0;
        let mut count = 0u32;
        for response in responses {
            if group.agent_ids.iter().any(|id| *id == response.agent_id) {
                total += response.confidence;
                count += 1;
            }
        }
        if count == 0 { 0.0 } else { total / f64::from(count) }
    }
}

impl Default for ConsensusCalculator {
    fn default() -> Self {
        Self::new(defaults::CONSENSUS_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(agent: &str, text: &str, confidence: f64, embedding: Vec<f32>) -> AgentResponse {
        AgentResponse::new(agent, text, confidence).with_embedding(embedding)
    }

    fn agreeing(agent: &str, confidence: f64) -> AgentResponse {
        response(agent, "shared answer", confidence, vec![1.0, 0.0, 0.0])
    }

    fn dissenting(agent: &str, confidence: f64) -> AgentResponse {
        response(agent, "other answer", confidence, vec![0.0, 1.0, 0.0])
    }

    #[test]
    fn test_below_minimum_errors() {
        let calc = ConsensusCalculator::default();
        let responses = vec![agreeing("a", 90.0), agreeing("b", 90.0)];

        let err = calc.calculate(&responses).unwrap_err();
        assert_eq!(err.to_string(), "minimum 3 agents required, got 2");
    }

    #[test]
    fn test_unanimous_uniform_confidence_scores_100() {
        let calc = ConsensusCalculator::default();
        let responses = vec![agreeing("a", 80.0), agreeing("b", 80.0), agreeing("c", 80.0)];

        let result = calc.calculate(&responses).unwrap();
        assert!((result.agreement_score - 100.0).abs() < 1e-9);
        assert!(result.threshold_met);
        assert_eq!(result.status, DeliberationStatus::Consensus);
        assert_eq!(result.final_response, "shared answer");
        assert!((result.confidence_score - 80.0).abs() < 1e-9);
        assert!(result.dissenting_agents.is_empty());
        assert_eq!(result.method, "weighted_vote");
    }

    #[test]
    fn test_weighted_vote_exact_formula() {
        // 3 similar at {95, 92, 93}, 2 dissenting at {88, 80}:
        // 280 / 448 * 100 = 62.5, below an 0.80 threshold.
        let calc = ConsensusCalculator::new(0.80);
        let responses = vec![
            agreeing("a", 95.0),
            agreeing("b", 92.0),
            agreeing("c", 93.0),
            dissenting("d", 88.0),
            dissenting("e", 80.0),
        ];

        let result = calc.calculate(&responses).unwrap();
        assert!((result.agreement_score - 62.5).abs() < 1e-9);
        assert!(!result.threshold_met);
        assert_eq!(result.status, DeliberationStatus::Uncertain);
        assert_eq!(result.final_response, "");
        assert_eq!(result.confidence_score, 0.0);
        assert_eq!(result.dissenting_agents, vec!["d", "e"]);
    }

    #[test]
    fn test_confident_minority_outvotes_hesitant_majority() {
        // Two agents at 100 vs three at 10: weighted agreement is
        // 200/230 ≈ 87% even though the minority is outnumbered.
        let calc = ConsensusCalculator::new(0.80);
        let responses = vec![
            agreeing("a", 100.0),
            agreeing("b", 100.0),
            dissenting("c", 10.0),
            dissenting("d", 10.0),
            dissenting("e", 10.0),
        ];

        let result = calc.calculate(&responses).unwrap();
        assert!(result.agreement_score > 80.0);
        assert!(result.threshold_met);
    }

    #[test]
    fn test_agreement_invariant_under_permutation() {
        let calc = ConsensusCalculator::default();
        let base = vec![
            agreeing("a", 95.0),
            agreeing("b", 92.0),
            agreeing("c", 93.0),
            dissenting("d", 88.0),
            dissenting("e", 80.0),
        ];
        let expected = calc.calculate(&base).unwrap().agreement_score;

        let mut permuted = base.clone();
        permuted.reverse();
        let score = calc.calculate(&permuted).unwrap().agreement_score;
        assert!((score - expected).abs() < 1e-9);

        permuted.swap(0, 2);
        permuted.swap(1, 4);
        let score = calc.calculate(&permuted).unwrap().agreement_score;
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_consensus_confidence_is_group_mean() {
        let calc = ConsensusCalculator::new(0.60);
        let responses = vec![
            agreeing("a", 95.0),
            agreeing("b", 85.0),
            agreeing("c", 90.0),
            dissenting("d", 50.0),
        ];

        let result = calc.calculate(&responses).unwrap();
        assert!(result.threshold_met);
        assert!((result.confidence_score - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_responses_resolve_uncertain_when_minimum_disabled() {
        let calc = ConsensusCalculator::with_min_agents(0.80, 0);

        let result = calc.calculate(&[]).unwrap();
        assert!(!result.threshold_met);
        assert_eq!(result.status, DeliberationStatus::Uncertain);
        assert_eq!(result.agreement_score, 0.0);
        assert_eq!(result.final_response, "");
        assert!(result.equivalence_groups.is_empty());
        assert!(result.dissenting_agents.is_empty());
        assert_eq!(result.method, "weighted_vote");
    }

    #[test]
    fn test_scores_stay_in_range() {
        let calc = ConsensusCalculator::default();
        let responses = vec![agreeing("a", 100.0), agreeing("b", 100.0), dissenting("c", 100.0)];

        let result = calc.calculate(&responses).unwrap();
        assert!(result.agreement_score >= 0.0);
        assert!(result.agreement_score <= 100.0);
    }
}
