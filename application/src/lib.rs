//! Application layer for the council deliberation engine.
//!
//! Defines the ports the council consumes, the resilience and health
//! machinery around agents, evidence retrieval, and the use cases that
//! orchestrate deliberations. Adapters live in the infrastructure
//! crate.

pub mod agent_wrapper;
pub mod config;
pub mod evidence_retriever;
pub mod health_monitor;
pub mod ports;
pub mod use_cases;

pub use agent_wrapper::AgentWrapper;
pub use config::CouncilConfig;
pub use evidence_retriever::EvidenceRetriever;
pub use health_monitor::{HealthMonitor, HealthSummary};
pub use use_cases::{DeliberateError, DeliberateUseCase, ReviewUseCase};
