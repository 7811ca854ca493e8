//! Deliberation entities - one query-processing session across the agent council.

pub mod entities;

pub use entities::{
    AgentInstance, AgentResponse, AuditAction, AuditEntry, CreateDeliberationRequest,
    Deliberation, DeliberationResult, DeliberationStatus, FlagDeliberationRequest,
};
