//! Registry and background sweeper for agent health.
//!
//! The monitor owns one [`AgentHealthState`] per registered agent,
//! shared with the corresponding [`crate::agent_wrapper::AgentWrapper`]
//! so that query outcomes and sweep demotions act on the same state
//! machine. Status transitions are surfaced through an optional
//! callback and as structured log events.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use council_domain::deliberation::AgentInstance;
use council_domain::health::{
    AgentHealthState, AgentHealthStatus, CircuitState, HealthConfig, HealthEvent, HealthMetrics,
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lock a shared health state, recovering from poisoning. The state
/// machine stays internally consistent even if a holder panicked
/// mid-update, so continuing with the inner value is safe.
pub(crate) fn lock_state(state: &Mutex<AgentHealthState>) -> MutexGuard<'_, AgentHealthState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

type HealthCallback = Box<dyn Fn(&HealthEvent) + Send + Sync>;

/// Aggregate health rollup across the council.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthSummary {
    pub total: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub failed: usize,
}

struct MonitorInner {
    states: RwLock<HashMap<String, Arc<Mutex<AgentHealthState>>>>,
    callback: RwLock<Option<HealthCallback>>,
    config: HealthConfig,
    sweep_interval: std::time::Duration,
    // Replaced on every start() so the monitor can be restarted.
    cancel: RwLock<CancellationToken>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

/// Shared handle to the council's health registry.
#[derive(Clone)]
pub struct HealthMonitor {
    inner: Arc<MonitorInner>,
}

impl HealthMonitor {
    pub fn new(config: HealthConfig, sweep_interval: std::time::Duration) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                states: RwLock::new(HashMap::new()),
                callback: RwLock::new(None),
                config,
                sweep_interval,
                cancel: RwLock::new(CancellationToken::new()),
                sweeper: Mutex::new(None),
            }),
        }
    }

    /// Register an agent and return its shared health state, for the
    /// wrapper that will record query outcomes against it.
    pub fn register_agent(&self, instance: AgentInstance) -> Arc<Mutex<AgentHealthState>> {
        let id = instance.id.clone();
        let state = Arc::new(Mutex::new(AgentHealthState::new(
            instance,
            self.inner.config.clone(),
            Utc::now(),
        )));
        self.states_write().insert(id, Arc::clone(&state));
        state
    }

    pub fn set_health_change_callback<F>(&self, callback: F)
    where
        F: Fn(&HealthEvent) + Send + Sync + 'static,
    {
        let mut slot = match self.inner.callback.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(Box::new(callback));
    }

    /// Start the periodic heartbeat-staleness sweep. Restartable: a
    /// stopped monitor gets a fresh sweep loop on the next call.
    pub fn start(&self) {
        let monitor = self.clone();
        let interval = self.inner.sweep_interval;
        let cancel = CancellationToken::new();
        {
            let mut slot = match self.inner.cancel.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            slot.cancel();
            *slot = cancel.clone();
        }
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("health sweep loop stopped");
                        return;
                    }
                    _ = ticker.tick() => monitor.sweep(Utc::now()),
                }
            }
        });
        let mut slot = match self.inner.sweeper.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
        info!(interval_secs = interval.as_secs(), "health monitor started");
    }

    /// Stop the sweep loop. Idempotent.
    pub fn stop(&self) {
        let cancel = match self.inner.cancel.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cancel.cancel();
        info!("health monitor stopped");
    }

    /// Run one demote-only staleness pass over every agent.
    pub fn sweep(&self, now: DateTime<Utc>) {
        let states: Vec<Arc<Mutex<AgentHealthState>>> =
            self.states_read().values().cloned().collect();
        for state in states {
            let event = lock_state(&state).sweep(now);
            if let Some(event) = event {
                self.publish(&event);
            }
        }
    }

    /// Record an external heartbeat for an agent.
    pub fn record_heartbeat(&self, agent_id: &str, now: DateTime<Utc>) {
        let Some(state) = self.state_of(agent_id) else {
            warn!(agent_id, "heartbeat for unknown agent");
            return;
        };
        let event = lock_state(&state).record_heartbeat(now);
        if let Some(event) = event {
            self.publish(&event);
        }
    }

    /// Operator recovery: close the circuit and restore healthy status.
    pub fn recover_agent(&self, agent_id: &str, now: DateTime<Utc>) -> bool {
        let Some(state) = self.state_of(agent_id) else {
            return false;
        };
        let event = lock_state(&state).recover(now);
        if let Some(event) = event {
            self.publish(&event);
        }
        true
    }

    pub fn agent_status(&self, agent_id: &str) -> Option<AgentHealthStatus> {
        self.state_of(agent_id).map(|s| lock_state(&s).status())
    }

    pub fn circuit_state(&self, agent_id: &str) -> Option<CircuitState> {
        self.state_of(agent_id)
            .map(|s| lock_state(&s).circuit_state())
    }

    pub fn agent_metrics(&self, agent_id: &str) -> Option<HealthMetrics> {
        self.state_of(agent_id)
            .map(|s| lock_state(&s).metrics().clone())
    }

    /// Instances currently able to take work (not failed, circuit admits).
    pub fn available_agents(&self, now: DateTime<Utc>) -> Vec<AgentInstance> {
        let states: Vec<Arc<Mutex<AgentHealthState>>> =
            self.states_read().values().cloned().collect();
        let mut available = Vec::new();
        for state in states {
            let mut guard = lock_state(&state);
            if guard.can_accept_request(now) {
                available.push(guard.instance().clone());
            }
        }
        available.sort_by(|a, b| a.id.cmp(&b.id));
        available
    }

    pub fn summary(&self) -> HealthSummary {
        let states: Vec<Arc<Mutex<AgentHealthState>>> =
            self.states_read().values().cloned().collect();
        let mut summary = HealthSummary::default();
        for state in states {
            summary.total += 1;
            match lock_state(&state).status() {
                AgentHealthStatus::Healthy => summary.healthy += 1,
                AgentHealthStatus::Degraded => summary.degraded += 1,
                AgentHealthStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }

    /// Log a status transition and notify the callback, if any.
    pub(crate) fn publish(&self, event: &HealthEvent) {
        info!(
            agent_id = %event.agent_id,
            agent_name = %event.agent_name,
            old_status = %event.old_status,
            new_status = %event.new_status,
            reason = %event.reason,
            "agent health changed"
        );
        let callback = match self.inner.callback.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(callback) = callback.as_ref() {
            callback(event);
        }
    }

    fn state_of(&self, agent_id: &str) -> Option<Arc<Mutex<AgentHealthState>>> {
        self.states_read().get(agent_id).cloned()
    }

    fn states_read(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Mutex<AgentHealthState>>>> {
        match self.inner.states.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn states_write(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Mutex<AgentHealthState>>>> {
        match self.inner.states.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for MonitorInner {
    fn drop(&mut self) {
        match self.cancel.get_mut() {
            Ok(cancel) => cancel.cancel(),
            Err(poisoned) => poisoned.into_inner().cancel(),
        }
        let handle = match self.sweeper.lock() {
            Ok(mut guard) => guard.take(),
            Err(mut poisoned) => poisoned.get_mut().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}
