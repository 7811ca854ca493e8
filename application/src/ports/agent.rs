//! Port for a council agent backend.

use async_trait::async_trait;
use council_domain::AgentResponse;
use thiserror::Error;

/// Errors surfaced by an agent call, including the wrapper-imposed ones.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The agent did not answer within the configured timeout.
    #[error("agent timed out")]
    Timeout,

    /// The deliberation was cancelled before the agent answered.
    #[error("deliberation cancelled")]
    Cancelled,

    /// The circuit breaker is open and the call was never attempted.
    #[error("circuit breaker open")]
    CircuitOpen,

    /// The backend is reachable but refused the request.
    #[error("agent unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error("agent call failed: {0}")]
    Backend(String),
}

/// A single member of the council.
///
/// Implementations answer a natural-language query with a response,
/// a confidence score and (optionally) an embedding of the answer.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable identifier of this agent instance.
    fn id(&self) -> &str;

    /// Human-readable name, e.g. the backing model.
    fn name(&self) -> &str;

    /// Answer the query. The returned response carries this agent's id.
    async fn query(&self, query: &str) -> Result<AgentResponse, AgentError>;
}
