//! Resilience wrapper around an agent backend.
//!
//! Enforces the per-agent timeout and the circuit breaker, and feeds
//! every outcome into the shared health state so wrapper and monitor
//! see the same picture. Cancellation and timeout are distinct errors:
//! a parent cancelling the whole deliberation is not the agent's fault,
//! but both count as failures for the circuit.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use council_domain::deliberation::AgentResponse;
use council_domain::health::AgentHealthState;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::health_monitor::{HealthMonitor, lock_state};
use crate::ports::{Agent, AgentError};

/// An agent plus its timeout and circuit breaker. Cheap to clone; all
/// clones share the same health state.
#[derive(Clone)]
pub struct AgentWrapper {
    agent: Arc<dyn Agent>,
    timeout: Duration,
    health: Arc<Mutex<AgentHealthState>>,
    monitor: HealthMonitor,
}

impl AgentWrapper {
    pub fn new(
        agent: Arc<dyn Agent>,
        timeout: Duration,
        health: Arc<Mutex<AgentHealthState>>,
        monitor: HealthMonitor,
    ) -> Self {
        Self {
            agent,
            timeout,
            health,
            monitor,
        }
    }

    pub fn agent_id(&self) -> &str {
        self.agent.id()
    }

    pub fn agent_name(&self) -> &str {
        self.agent.name()
    }

    /// Whether this agent is currently eligible for a query.
    pub fn can_accept_request(&self) -> bool {
        lock_state(&self.health).can_accept_request(Utc::now())
    }

    /// Query the agent, racing the backend against the timeout and the
    /// caller's cancellation token.
    pub async fn query(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<AgentResponse, AgentError> {
        if !lock_state(&self.health).admits(Utc::now()) {
            debug!(agent_id = self.agent.id(), "circuit open, skipping agent");
            return Err(AgentError::CircuitOpen);
        }

        let started = std::time::Instant::now();
        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
            result = tokio::time::timeout(self.timeout, self.agent.query(query)) => {
                match result {
                    Ok(inner) => inner,
                    Err(_elapsed) => Err(AgentError::Timeout),
                }
            }
        };

        let now = Utc::now();
        match outcome {
            Ok(response) => {
                let elapsed = chrono::Duration::milliseconds(started.elapsed().as_millis() as i64);
                let event = lock_state(&self.health).record_success(elapsed, now);
                if let Some(event) = event {
                    self.monitor.publish(&event);
                }
                Ok(response)
            }
            Err(error) => {
                let event = lock_state(&self.health).record_failure(&error.to_string(), now);
                if let Some(event) = event {
                    self.monitor.publish(&event);
                }
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use council_domain::deliberation::AgentInstance;
    use council_domain::health::{AgentHealthStatus, CircuitState, HealthConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test double: answers after a fixed delay, or fails.
    struct FakeAgent {
        id: String,
        delay: Duration,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeAgent {
        fn new(id: &str, delay: Duration, fail: bool) -> Self {
            Self {
                id: id.to_string(),
                delay,
                fail,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Agent for FakeAgent {
        fn id(&self) -> &str {
            &self.id
        }

        fn name(&self) -> &str {
            "fake"
        }

        async fn query(&self, _query: &str) -> Result<AgentResponse, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                Err(AgentError::Backend("scripted failure".into()))
            } else {
                Ok(AgentResponse::new(&self.id, "answer", 90.0))
            }
        }
    }

    fn wrapper(agent: Arc<FakeAgent>, timeout: Duration) -> AgentWrapper {
        let monitor = HealthMonitor::new(HealthConfig::default(), Duration::from_secs(10));
        let health = monitor.register_agent(AgentInstance::new(agent.id(), "fake", 3));
        AgentWrapper::new(agent, timeout, health, monitor)
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_enforced() {
        let agent = Arc::new(FakeAgent::new("slow", Duration::from_secs(10), false));
        let w = wrapper(Arc::clone(&agent), Duration::from_millis(100));

        let result = w.query("q", &CancellationToken::new()).await;
        assert!(matches!(result, Err(AgentError::Timeout)));
        assert_eq!(agent.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_is_distinct_from_timeout() {
        let agent = Arc::new(FakeAgent::new("slow", Duration::from_secs(10), false));
        let w = wrapper(agent, Duration::from_secs(30));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = w.query("q", &cancel).await;
        assert!(matches!(result, Err(AgentError::Cancelled)));
    }

    #[tokio::test]
    async fn test_open_circuit_skips_backend_entirely() {
        let agent = Arc::new(FakeAgent::new("broken", Duration::ZERO, true));
        let w = wrapper(Arc::clone(&agent), Duration::from_secs(1));
        let cancel = CancellationToken::new();

        for _ in 0..3 {
            let _ = w.query("q", &cancel).await;
        }
        assert_eq!(agent.calls.load(Ordering::SeqCst), 3);

        // Fourth call is rejected without invoking the backend.
        let result = w.query("q", &cancel).await;
        assert!(matches!(result, Err(AgentError::CircuitOpen)));
        assert_eq!(agent.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_success_records_health() {
        let agent = Arc::new(FakeAgent::new("ok", Duration::ZERO, false));
        let monitor = HealthMonitor::new(
            HealthConfig::default(),
            Duration::from_secs(10),
        );
        let health = monitor.register_agent(AgentInstance::new("ok", "fake", 3));
        let w = AgentWrapper::new(agent, Duration::from_secs(1), health, monitor.clone());

        let response = w.query("q", &CancellationToken::new()).await.unwrap();
        assert_eq!(response.agent_id, "ok");

        let metrics = monitor.agent_metrics("ok").unwrap();
        assert_eq!(metrics.successful_responses, 1);
        assert_eq!(monitor.agent_status("ok"), Some(AgentHealthStatus::Healthy));
        assert_eq!(monitor.circuit_state("ok"), Some(CircuitState::Closed));
    }
}
