//! The per-agent health state machine.
//!
//! Two independent signals drive an agent's status:
//! - explicit success/failure recording from query attempts
//! - heartbeat-staleness sweeps on a fixed interval
//!
//! Transition rules:
//! - 2 consecutive failures → degraded; ≥5 → failed
//! - a success resets the failure counter and promotes degraded →
//!   healthy, but never failed → healthy: a failed agent needs a
//!   heartbeat (received while merely degraded) or an explicit
//!   operator [`AgentHealthState::recover`]
//! - no heartbeat for >30s → degraded; >60s → failed
//!
//! All methods take `now` explicitly; the caller owns the clock.

use crate::core::defaults;
use crate::deliberation::AgentInstance;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Health classification of an agent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentHealthStatus {
    /// Agent responding normally
    Healthy,
    /// Agent slow or intermittent
    Degraded,
    /// Agent not responding
    Failed,
}

impl std::fmt::Display for AgentHealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentHealthStatus::Healthy => "healthy",
            AgentHealthStatus::Degraded => "degraded",
            AgentHealthStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Requests flow normally
    Closed,
    /// Requests are rejected until the cooldown elapses
    Open,
    /// Probing whether the agent recovered
    HalfOpen,
}

/// Thresholds and windows for the health state machine.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Consecutive failures before the circuit opens.
    pub circuit_failure_threshold: u32,
    /// Cooldown before an open circuit admits a half-open probe.
    pub circuit_cooldown: Duration,
    /// Consecutive failures before the agent is marked degraded.
    pub degraded_failure_threshold: u32,
    /// Consecutive failures before the agent is marked failed.
    pub failed_failure_threshold: u32,
    /// Heartbeat age past which the agent is degraded.
    pub heartbeat_degraded_after: Duration,
    /// Heartbeat age past which the agent is failed.
    pub heartbeat_failed_after: Duration,
    /// Maximum retained health events.
    pub history_cap: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            circuit_failure_threshold: defaults::CIRCUIT_FAILURE_THRESHOLD,
            circuit_cooldown: Duration::seconds(defaults::CIRCUIT_COOLDOWN_SECS),
            degraded_failure_threshold: defaults::DEGRADED_FAILURE_THRESHOLD,
            failed_failure_threshold: defaults::FAILED_FAILURE_THRESHOLD,
            heartbeat_degraded_after: Duration::seconds(defaults::HEARTBEAT_DEGRADED_SECS),
            heartbeat_failed_after: Duration::seconds(defaults::HEARTBEAT_FAILED_SECS),
            history_cap: defaults::HEALTH_HISTORY_CAP,
        }
    }
}

/// A health status change event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthEvent {
    pub agent_id: String,
    pub agent_name: String,
    pub old_status: AgentHealthStatus,
    pub new_status: AgentHealthStatus,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// Health-related counters for an agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthMetrics {
    pub total_deliberations: u64,
    pub successful_responses: u64,
    pub failed_responses: u64,
    pub consecutive_failures: u32,
    pub average_response_ms: i64,
    pub last_response_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_at: Option<DateTime<Utc>>,
}

/// Combined circuit breaker and health tracker for a single agent.
///
/// The application layer holds one of these per agent behind a mutex;
/// [`CircuitState`] and [`AgentHealthStatus`] are read-only views over
/// the same state transitions.
#[derive(Debug)]
pub struct AgentHealthState {
    instance: AgentInstance,
    config: HealthConfig,
    status: AgentHealthStatus,
    circuit: CircuitState,
    circuit_failures: u32,
    circuit_successes: u32,
    last_failure_at: Option<DateTime<Utc>>,
    last_heartbeat: DateTime<Utc>,
    metrics: HealthMetrics,
    history: VecDeque<HealthEvent>,
}

impl AgentHealthState {
    pub fn new(instance: AgentInstance, config: HealthConfig, now: DateTime<Utc>) -> Self {
        Self {
            instance,
            config,
            status: AgentHealthStatus::Healthy,
            circuit: CircuitState::Closed,
            circuit_failures: 0,
            circuit_successes: 0,
            last_failure_at: None,
            last_heartbeat: now,
            metrics: HealthMetrics::default(),
            history: VecDeque::new(),
        }
    }

    /// Circuit admission check. An open circuit transitions to
    /// half-open (and admits the probe) once the cooldown has elapsed.
    pub fn admits(&mut self, now: DateTime<Utc>) -> bool {
        match self.circuit {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled_down = self
                    .last_failure_at
                    .is_none_or(|at| now - at > self.config.circuit_cooldown);
                if cooled_down {
                    self.circuit = CircuitState::HalfOpen;
                    self.circuit_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Whether the agent is eligible for new work: not failed, and the
    /// circuit admits.
    pub fn can_accept_request(&mut self, now: DateTime<Utc>) -> bool {
        self.status != AgentHealthStatus::Failed && self.admits(now)
    }

    /// Record a successful response.
    ///
    /// Resets the consecutive-failure counter and promotes a degraded
    /// agent back to healthy. A failed agent is deliberately NOT
    /// promoted by a single success, so one transient success cannot
    /// mask systemic failure.
    pub fn record_success(
        &mut self,
        response_time: Duration,
        now: DateTime<Utc>,
    ) -> Option<HealthEvent> {
        self.metrics.successful_responses += 1;
        self.metrics.total_deliberations += 1;
        self.metrics.last_response_ms = response_time.num_milliseconds();
        self.metrics.last_success_at = Some(now);
        self.metrics.consecutive_failures = 0;
        self.metrics.average_response_ms = if self.metrics.average_response_ms == 0 {
            self.metrics.last_response_ms
        } else {
            (self.metrics.average_response_ms + self.metrics.last_response_ms) / 2
        };

        self.circuit_failures = 0;
        if self.circuit == CircuitState::HalfOpen {
            self.circuit_successes += 1;
            if self.circuit_successes >= self.config.circuit_failure_threshold {
                self.circuit = CircuitState::Closed;
            }
        }

        if self.status == AgentHealthStatus::Degraded {
            self.transition(AgentHealthStatus::Healthy, "successful response", now)
        } else {
            None
        }
    }

    /// Record a failed response (agent error, timeout, or cancellation).
    pub fn record_failure(&mut self, reason: &str, now: DateTime<Utc>) -> Option<HealthEvent> {
        self.metrics.failed_responses += 1;
        self.metrics.total_deliberations += 1;
        self.metrics.last_failure_at = Some(now);
        self.metrics.consecutive_failures += 1;

        self.last_failure_at = Some(now);
        self.circuit_successes = 0;
        match self.circuit {
            // Any failure while probing reopens and restarts the cooldown.
            CircuitState::HalfOpen => {
                self.circuit = CircuitState::Open;
                self.circuit_failures = self.config.circuit_failure_threshold;
            }
            _ => {
                self.circuit_failures += 1;
                if self.circuit_failures >= self.config.circuit_failure_threshold {
                    self.circuit = CircuitState::Open;
                }
            }
        }

        if self.metrics.consecutive_failures >= self.config.failed_failure_threshold {
            self.transition(AgentHealthStatus::Failed, reason, now)
        } else if self.metrics.consecutive_failures >= self.config.degraded_failure_threshold {
            self.transition(AgentHealthStatus::Degraded, reason, now)
        } else {
            None
        }
    }

    /// Record a heartbeat. Promotes a degraded agent back to healthy;
    /// a failed agent stays failed until operator recovery.
    pub fn record_heartbeat(&mut self, now: DateTime<Utc>) -> Option<HealthEvent> {
        self.last_heartbeat = now;
        self.instance.last_heartbeat = now;
        if self.status == AgentHealthStatus::Degraded {
            self.transition(AgentHealthStatus::Healthy, "heartbeat received", now)
        } else {
            None
        }
    }

    /// Heartbeat-staleness sweep. Only demotes; promotion happens via
    /// [`Self::record_heartbeat`] or [`Self::recover`].
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Option<HealthEvent> {
        let age = now - self.last_heartbeat;
        if age > self.config.heartbeat_failed_after {
            self.transition(AgentHealthStatus::Failed, "heartbeat timeout exceeded", now)
        } else if age > self.config.heartbeat_degraded_after
            && self.status == AgentHealthStatus::Healthy
        {
            self.transition(AgentHealthStatus::Degraded, "heartbeat delayed", now)
        } else {
            None
        }
    }

    /// Explicit operator recovery: closes the circuit, clears counters,
    /// and restores the agent to healthy.
    pub fn recover(&mut self, now: DateTime<Utc>) -> Option<HealthEvent> {
        self.circuit = CircuitState::Closed;
        self.circuit_failures = 0;
        self.circuit_successes = 0;
        self.metrics.consecutive_failures = 0;
        self.last_heartbeat = now;
        self.instance.last_heartbeat = now;
        self.transition(AgentHealthStatus::Healthy, "operator recovery", now)
    }

    pub fn status(&self) -> AgentHealthStatus {
        self.status
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit
    }

    pub fn metrics(&self) -> &HealthMetrics {
        &self.metrics
    }

    pub fn instance(&self) -> &AgentInstance {
        &self.instance
    }

    pub fn history(&self) -> impl Iterator<Item = &HealthEvent> {
        self.history.iter()
    }

    fn transition(
        &mut self,
        new_status: AgentHealthStatus,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Option<HealthEvent> {
        if new_status == self.status {
            return None;
        }

        let event = HealthEvent {
            agent_id: self.instance.id.clone(),
            agent_name: self.instance.name.clone(),
            old_status: self.status,
            new_status,
            reason: reason.to_string(),
            timestamp: now,
        };

        self.status = new_status;
        self.instance.health_status = new_status;

        self.history.push_back(event.clone());
        while self.history.len() > self.config.history_cap {
            self.history.pop_front();
        }

        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AgentHealthState {
        let instance = AgentInstance::new("agent-1", "Agent One", 3);
        AgentHealthState::new(instance, HealthConfig::default(), Utc::now())
    }

    #[test]
    fn test_circuit_opens_after_threshold_failures() {
        let mut s = state();
        let now = Utc::now();

        for _ in 0..2 {
            s.record_failure("boom", now);
            assert_eq!(s.circuit_state(), CircuitState::Closed);
        }
        s.record_failure("boom", now);
        assert_eq!(s.circuit_state(), CircuitState::Open);
        assert!(!s.admits(now));
    }

    #[test]
    fn test_circuit_half_open_after_cooldown() {
        let mut s = state();
        let t0 = Utc::now();
        for _ in 0..3 {
            s.record_failure("boom", t0);
        }
        assert!(!s.admits(t0 + Duration::seconds(29)));

        let later = t0 + Duration::seconds(31);
        assert!(s.admits(later));
        assert_eq!(s.circuit_state(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_half_open_failure_reopens_and_resets_cooldown() {
        let mut s = state();
        let t0 = Utc::now();
        for _ in 0..3 {
            s.record_failure("boom", t0);
        }
        let probe_at = t0 + Duration::seconds(31);
        assert!(s.admits(probe_at));

        s.record_failure("still broken", probe_at);
        assert_eq!(s.circuit_state(), CircuitState::Open);
        // Cooldown clock restarts from the half-open failure.
        assert!(!s.admits(t0 + Duration::seconds(60)));
        assert!(s.admits(probe_at + Duration::seconds(31)));
    }

    #[test]
    fn test_half_open_success_streak_closes() {
        let mut s = state();
        let t0 = Utc::now();
        for _ in 0..3 {
            s.record_failure("boom", t0);
        }
        let probe_at = t0 + Duration::seconds(31);
        assert!(s.admits(probe_at));

        for _ in 0..3 {
            s.record_success(Duration::milliseconds(5), probe_at);
        }
        assert_eq!(s.circuit_state(), CircuitState::Closed);
    }

    #[test]
    fn test_two_failures_degrade_five_fail() {
        let mut s = state();
        let now = Utc::now();

        s.record_failure("err", now);
        assert_eq!(s.status(), AgentHealthStatus::Healthy);

        let event = s.record_failure("err", now).unwrap();
        assert_eq!(event.new_status, AgentHealthStatus::Degraded);

        for _ in 0..2 {
            assert!(s.record_failure("err", now).is_none());
        }
        let event = s.record_failure("err", now).unwrap();
        assert_eq!(event.new_status, AgentHealthStatus::Failed);
    }

    #[test]
    fn test_success_promotes_degraded_but_not_failed() {
        let mut s = state();
        let now = Utc::now();

        s.record_failure("err", now);
        s.record_failure("err", now);
        assert_eq!(s.status(), AgentHealthStatus::Degraded);

        let event = s.record_success(Duration::milliseconds(10), now).unwrap();
        assert_eq!(event.new_status, AgentHealthStatus::Healthy);
        assert_eq!(s.metrics().consecutive_failures, 0);

        for _ in 0..5 {
            s.record_failure("err", now);
        }
        assert_eq!(s.status(), AgentHealthStatus::Failed);

        assert!(s.record_success(Duration::milliseconds(10), now).is_none());
        assert_eq!(s.status(), AgentHealthStatus::Failed);
    }

    #[test]
    fn test_heartbeat_promotes_degraded_only() {
        let mut s = state();
        let now = Utc::now();

        s.record_failure("err", now);
        s.record_failure("err", now);
        let event = s.record_heartbeat(now).unwrap();
        assert_eq!(event.new_status, AgentHealthStatus::Healthy);

        for _ in 0..5 {
            s.record_failure("err", now);
        }
        assert!(s.record_heartbeat(now).is_none());
        assert_eq!(s.status(), AgentHealthStatus::Failed);
    }

    #[test]
    fn test_sweep_staleness_thresholds() {
        let t0 = Utc::now();
        let instance = AgentInstance::new("agent-1", "Agent One", 3);
        let mut s = AgentHealthState::new(instance, HealthConfig::default(), t0);

        assert!(s.sweep(t0 + Duration::seconds(10)).is_none());

        let event = s.sweep(t0 + Duration::seconds(31)).unwrap();
        assert_eq!(event.new_status, AgentHealthStatus::Degraded);
        assert_eq!(event.reason, "heartbeat delayed");

        let event = s.sweep(t0 + Duration::seconds(61)).unwrap();
        assert_eq!(event.new_status, AgentHealthStatus::Failed);
        assert_eq!(event.reason, "heartbeat timeout exceeded");
    }

    #[test]
    fn test_failed_agent_cannot_accept_requests() {
        let mut s = state();
        let now = Utc::now();
        for _ in 0..5 {
            s.record_failure("err", now);
        }
        assert!(!s.can_accept_request(now + Duration::seconds(120)));
    }

    #[test]
    fn test_operator_recovery_restores_failed() {
        let mut s = state();
        let now = Utc::now();
        for _ in 0..5 {
            s.record_failure("err", now);
        }
        let event = s.recover(now).unwrap();
        assert_eq!(event.new_status, AgentHealthStatus::Healthy);
        assert_eq!(event.reason, "operator recovery");
        assert_eq!(s.circuit_state(), CircuitState::Closed);
        assert!(s.can_accept_request(now));
    }

    #[test]
    fn test_history_is_bounded() {
        let instance = AgentInstance::new("agent-1", "Agent One", 3);
        let config = HealthConfig {
            history_cap: 4,
            ..HealthConfig::default()
        };
        let now = Utc::now();
        let mut s = AgentHealthState::new(instance, config, now);

        // Oscillate degraded/healthy to generate many events.
        for _ in 0..20 {
            s.record_failure("err", now);
            s.record_failure("err", now);
            s.record_success(Duration::milliseconds(1), now);
        }
        assert!(s.history().count() <= 4);
    }
}
