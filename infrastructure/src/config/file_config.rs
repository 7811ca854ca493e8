//! TOML-backed configuration for the council.
//!
//! Example configuration:
//!
//! ```toml
//! [council]
//! min_agents = 3
//! consensus_threshold = 0.80
//! semantic_threshold = 0.95
//! agent_timeout_secs = 3
//! max_hops = 3
//! cache_ttl_minutes = 5
//!
//! [evidence]
//! min_nodes = 2
//! min_relevance = 0.5
//!
//! [health]
//! circuit_failure_threshold = 3
//! circuit_cooldown_secs = 30
//! heartbeat_degraded_secs = 30
//! heartbeat_failed_secs = 60
//! ```

use std::time::Duration;

use council_application::config::CouncilConfig;
use council_domain::defaults;
use council_domain::health::HealthConfig;
use serde::{Deserialize, Serialize};

/// The `[council]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCouncilConfig {
    pub min_agents: usize,
    pub consensus_threshold: f64,
    pub semantic_threshold: f64,
    pub agent_timeout_secs: u64,
    pub max_hops: usize,
    pub cache_ttl_minutes: i64,
    pub related_node_limit: usize,
}

impl Default for FileCouncilConfig {
    fn default() -> Self {
        Self {
            min_agents: defaults::MIN_AGENTS,
            consensus_threshold: defaults::CONSENSUS_THRESHOLD,
            semantic_threshold: defaults::SEMANTIC_THRESHOLD,
            agent_timeout_secs: defaults::AGENT_TIMEOUT_SECS,
            max_hops: defaults::MAX_HOPS,
            cache_ttl_minutes: defaults::CACHE_TTL_MINUTES,
            related_node_limit: 16,
        }
    }
}

/// The `[evidence]` section - the sufficiency gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEvidenceConfig {
    pub min_nodes: usize,
    pub min_relevance: f64,
}

impl Default for FileEvidenceConfig {
    fn default() -> Self {
        Self {
            min_nodes: 2,
            min_relevance: 0.5,
        }
    }
}

/// The `[health]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHealthConfig {
    pub circuit_failure_threshold: u32,
    pub circuit_cooldown_secs: i64,
    pub degraded_failure_threshold: u32,
    pub failed_failure_threshold: u32,
    pub heartbeat_degraded_secs: i64,
    pub heartbeat_failed_secs: i64,
    pub sweep_interval_secs: u64,
    pub history_cap: usize,
}

impl Default for FileHealthConfig {
    fn default() -> Self {
        Self {
            circuit_failure_threshold: defaults::CIRCUIT_FAILURE_THRESHOLD,
            circuit_cooldown_secs: defaults::CIRCUIT_COOLDOWN_SECS,
            degraded_failure_threshold: defaults::DEGRADED_FAILURE_THRESHOLD,
            failed_failure_threshold: defaults::FAILED_FAILURE_THRESHOLD,
            heartbeat_degraded_secs: defaults::HEARTBEAT_DEGRADED_SECS,
            heartbeat_failed_secs: defaults::HEARTBEAT_FAILED_SECS,
            sweep_interval_secs: defaults::HEALTH_SWEEP_INTERVAL_SECS,
            history_cap: defaults::HEALTH_HISTORY_CAP,
        }
    }
}

/// Root of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub council: FileCouncilConfig,
    pub evidence: FileEvidenceConfig,
    pub health: FileHealthConfig,
}

impl FileConfig {
    /// Convert the file representation into the runtime configuration.
    pub fn into_council_config(self) -> CouncilConfig {
        CouncilConfig {
            min_agents: self.council.min_agents,
            consensus_threshold: self.council.consensus_threshold,
            semantic_threshold: self.council.semantic_threshold,
            agent_timeout: Duration::from_secs(self.council.agent_timeout_secs),
            max_hops: self.council.max_hops,
            cache_ttl: chrono::Duration::minutes(self.council.cache_ttl_minutes),
            related_node_limit: self.council.related_node_limit,
            evidence_min_nodes: self.evidence.min_nodes,
            evidence_min_relevance: self.evidence.min_relevance,
            sweep_interval: Duration::from_secs(self.health.sweep_interval_secs),
            health: HealthConfig {
                circuit_failure_threshold: self.health.circuit_failure_threshold,
                circuit_cooldown: chrono::Duration::seconds(self.health.circuit_cooldown_secs),
                degraded_failure_threshold: self.health.degraded_failure_threshold,
                failed_failure_threshold: self.health.failed_failure_threshold,
                heartbeat_degraded_after: chrono::Duration::seconds(
                    self.health.heartbeat_degraded_secs,
                ),
                heartbeat_failed_after: chrono::Duration::seconds(
                    self.health.heartbeat_failed_secs,
                ),
                history_cap: self.health.history_cap,
            },
        }
    }
}
