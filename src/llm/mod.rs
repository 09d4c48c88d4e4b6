// src/llm/mod.rs
// External LLM collaborator: an opaque text-in/text-out completion call.
// The pipeline never inspects provider internals; it only needs the error
// taxonomy to decide between degrading a unit and aborting the request.

mod openai;

pub use openai::OpenAiProvider;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("authentication rejected by provider")]
    Auth,

    #[error("rate limited by provider")]
    RateLimit,

    #[error("provider quota exhausted")]
    Quota,

    #[error("requested model is unavailable")]
    ModelUnavailable,

    #[error("provider server error: {0}")]
    Server(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    /// Auth and quota failures mean the whole provider is unusable; they
    /// abort the request instead of degrading one generation unit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LlmError::Auth | LlmError::Quota)
    }

    /// Human-readable category for the top-level caller.
    pub fn category(&self) -> &'static str {
        match self {
            LlmError::Auth => "auth",
            LlmError::RateLimit => "rate-limit",
            LlmError::Quota => "quota",
            LlmError::ModelUnavailable => "model-unavailable",
            LlmError::Server(_) => "server",
            LlmError::Network(_) => "network",
            LlmError::MalformedResponse(_) => "malformed-response",
        }
    }
}

/// Universal completion interface for generation stages.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// One completion round trip. No per-call timeout: generation calls
    /// run to completion and cancellation happens at the pipeline level.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: usize,
    ) -> Result<String, LlmError>;
}
