//! Runtime configuration for the council.

use std::time::Duration;

use council_domain::defaults;
use council_domain::health::HealthConfig;

/// Tunables for a running council. Loaded from file/environment by the
/// infrastructure layer; `Default` mirrors the documented defaults.
#[derive(Debug, Clone)]
pub struct CouncilConfig {
    /// Minimum healthy agents to admit a deliberation, and minimum
    /// responses to attempt consensus.
    pub min_agents: usize,
    /// Agreement percentage (0.0..=1.0) at which consensus is declared.
    pub consensus_threshold: f64,
    /// Cosine similarity at which two responses count as equivalent.
    pub semantic_threshold: f64,
    /// Per-agent query deadline.
    pub agent_timeout: Duration,
    /// Evidence traversal depth limit.
    pub max_hops: usize,
    /// How long a cached evidence trail stays fresh.
    pub cache_ttl: chrono::Duration,
    /// Neighbor fan-out cap per traversal step.
    pub related_node_limit: usize,
    /// Evidence sufficiency gate: minimum node count.
    pub evidence_min_nodes: usize,
    /// Evidence sufficiency gate: minimum average relevance.
    pub evidence_min_relevance: f64,
    /// Background health sweep cadence.
    pub sweep_interval: Duration,
    /// Circuit breaker and status transition thresholds.
    pub health: HealthConfig,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            min_agents: defaults::MIN_AGENTS,
            consensus_threshold: defaults::CONSENSUS_THRESHOLD,
            semantic_threshold: defaults::SEMANTIC_THRESHOLD,
            agent_timeout: Duration::from_secs(defaults::AGENT_TIMEOUT_SECS),
            max_hops: defaults::MAX_HOPS,
            cache_ttl: chrono::Duration::minutes(defaults::CACHE_TTL_MINUTES),
            related_node_limit: 16,
            evidence_min_nodes: 2,
            evidence_min_relevance: 0.5,
            sweep_interval: Duration::from_secs(defaults::HEALTH_SWEEP_INTERVAL_SECS),
            health: HealthConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = CouncilConfig::default();
        assert_eq!(config.min_agents, 3);
        assert!((config.consensus_threshold - 0.80).abs() < f64::EPSILON);
        assert!((config.semantic_threshold - 0.95).abs() < f64::EPSILON);
        assert_eq!(config.agent_timeout, Duration::from_secs(3));
        assert_eq!(config.max_hops, 3);
        assert_eq!(config.cache_ttl, chrono::Duration::minutes(5));
    }
}
