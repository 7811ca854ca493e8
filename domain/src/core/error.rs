//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("minimum {required} agents required, got {got}")]
    MinimumAgents { required: usize, got: usize },

    #[error("empty embedding")]
    EmptyEmbedding,

    #[error("embedding dimensions don't match: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("deliberation already completed: {0}")]
    AlreadyCompleted(String),

    #[error("invalid consensus threshold: {0}")]
    InvalidThreshold(f64),
}
