//! Deterministic agent backend.
//!
//! Answers every query with a fixed response, confidence and embedding,
//! optionally after a delay or with a scripted failure. Used for local
//! development and for exercising the council without live model
//! backends.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use council_application::ports::{Agent, AgentError};
use council_domain::deliberation::AgentResponse;

pub struct ScriptedAgent {
    id: String,
    name: String,
    response_text: String,
    confidence: f64,
    embedding: Vec<f32>,
    delay: Duration,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedAgent {
    pub fn new(id: impl Into<String>, response_text: impl Into<String>, confidence: f64) -> Self {
        let id = id.into();
        Self {
            name: format!("scripted:{id}"),
            id,
            response_text: response_text.into(),
            confidence,
            embedding: Vec::new(),
            delay: Duration::ZERO,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_failing(self, failing: bool) -> Self {
        self.failing.store(failing, Ordering::SeqCst);
        self
    }

    /// Toggle failure mode on a live agent.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of times the backend was actually invoked.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, _query: &str) -> Result<AgentResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(AgentError::Backend("scripted failure".to_string()));
        }
        Ok(
            AgentResponse::new(&self.id, &self.response_text, self.confidence)
                .with_embedding(self.embedding.clone()),
        )
    }
}
