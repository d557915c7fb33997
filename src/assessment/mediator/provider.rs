use std::future::Future;
use std::time::Duration;

use serde::Serialize;

/// Prompt handed to a provider together with the deadline the mediator will enforce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LlmRequest {
    pub system: String,
    pub prompt: String,
    pub deadline: Duration,
}

/// Failure reported by a provider before any response text was produced.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("llm advisory disabled")]
    Disabled,
    #[error("provider returned http status {0}")]
    Status(u16),
    #[error("provider transport failed: {0}")]
    Transport(String),
    #[error("provider response carried no completion text")]
    EmptyCompletion,
    #[error("provider task aborted: {0}")]
    Aborted(String),
}

/// Interchangeable request/response capability backing the mediator.
///
/// Implementations return the raw completion text; parsing and validation stay in the
/// mediator so every provider is held to the same schema.
pub trait LlmProvider: Send + Sync {
    fn complete(
        &self,
        request: &LlmRequest,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

/// Provider used when the advisory overlay is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLlm;

impl LlmProvider for NoLlm {
    async fn complete(&self, _request: &LlmRequest) -> Result<String, ProviderError> {
        Err(ProviderError::Disabled)
    }
}
