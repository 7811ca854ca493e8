//! Per-agent health tracking and circuit breaking.
//!
//! The circuit breaker (admission gate) and the health tracker
//! (observability) share one state object per agent, mutated under one
//! lock by the application layer, so the two views can never diverge.

pub mod state;

pub use state::{
    AgentHealthState, AgentHealthStatus, CircuitState, HealthConfig, HealthEvent, HealthMetrics,
};
