//! Default configuration values for the council.

/// Minimum number of agent responses required for consensus.
pub const MIN_AGENTS: usize = 3;

/// Agreement threshold (fraction of weighted votes) for consensus.
pub const CONSENSUS_THRESHOLD: f64 = 0.80;

/// Cosine-similarity threshold for semantic equivalence.
pub const SEMANTIC_THRESHOLD: f64 = 0.95;

/// Per-agent response timeout in seconds.
pub const AGENT_TIMEOUT_SECS: u64 = 3;

/// Evidence cache TTL in minutes.
pub const CACHE_TTL_MINUTES: i64 = 5;

/// Maximum knowledge-graph traversal depth.
pub const MAX_HOPS: usize = 3;

/// Consecutive failures before the circuit breaker opens.
pub const CIRCUIT_FAILURE_THRESHOLD: u32 = 3;

/// Circuit breaker cooldown before a half-open probe, in seconds.
pub const CIRCUIT_COOLDOWN_SECS: i64 = 30;

/// Consecutive failures before an agent is marked degraded.
pub const DEGRADED_FAILURE_THRESHOLD: u32 = 2;

/// Consecutive failures before an agent is marked failed.
pub const FAILED_FAILURE_THRESHOLD: u32 = 5;

/// Interval between heartbeat-staleness sweeps, in seconds.
pub const HEALTH_SWEEP_INTERVAL_SECS: u64 = 10;

/// Heartbeat age after which an agent is considered degraded, in seconds.
pub const HEARTBEAT_DEGRADED_SECS: i64 = 30;

/// Heartbeat age after which an agent is considered failed, in seconds.
pub const HEARTBEAT_FAILED_SECS: i64 = 60;

/// Maximum health events retained per agent.
pub const HEALTH_HISTORY_CAP: usize = 100;
