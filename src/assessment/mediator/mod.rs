//! Bounded, schema-validated interaction with an external language model.
//!
//! The mediator never fails: every timeout, provider error, or invalid response collapses into
//! a [`MediatorOutcome`] variant that the adjudicator maps onto the fallback taxonomy.

mod http;
mod prompt;
mod provider;
mod schema;

pub use http::HttpLlmProvider;
pub use prompt::{CategoryContext, HoursContext};
pub use provider::{LlmProvider, LlmRequest, NoLlm, ProviderError};
pub use schema::Rejection;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use super::domain::CategoryId;
use super::hours::HoursBand;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Value an LLM may be asked to pick, named by a fixed schema field.
pub trait Choice: Clone + PartialEq + fmt::Debug + Send + Sync {
    const SCHEMA_FIELD: &'static str;

    fn choice_id(&self) -> &str;
}

impl Choice for CategoryId {
    const SCHEMA_FIELD: &'static str = "category";

    fn choice_id(&self) -> &str {
        self.as_str()
    }
}

impl Choice for HoursBand {
    const SCHEMA_FIELD: &'static str = "band";

    fn choice_id(&self) -> &str {
        self.as_str()
    }
}

/// Validated LLM suggestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion<C> {
    pub choice: C,
    pub confidence: f64,
    pub reasoning: String,
}

/// What happened when the mediator was consulted.
#[derive(Debug, Clone, PartialEq)]
pub enum MediatorOutcome<C> {
    Suggested(Suggestion<C>),
    Disabled,
    TimedOut { after: Duration },
    Unavailable(String),
    Rejected(Rejection),
}

impl<C> MediatorOutcome<C> {
    /// Nullable view: the suggestion when one survived validation.
    pub fn suggestion(&self) -> Option<&Suggestion<C>> {
        match self {
            MediatorOutcome::Suggested(suggestion) => Some(suggestion),
            _ => None,
        }
    }

    pub fn into_suggestion(self) -> Option<Suggestion<C>> {
        match self {
            MediatorOutcome::Suggested(suggestion) => Some(suggestion),
            _ => None,
        }
    }
}

/// Issues prompts to a provider under a hard deadline and validates the replies.
pub struct Mediator<P> {
    provider: Arc<P>,
    timeout: Duration,
}

impl<P> Clone for Mediator<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            timeout: self.timeout,
        }
    }
}

impl<P: LlmProvider> Mediator<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn suggest_category(
        &self,
        context: &CategoryContext<'_>,
    ) -> MediatorOutcome<CategoryId> {
        let request = prompt::category_request(context, self.timeout);
        self.request(request, context.allowed.as_slice()).await
    }

    pub async fn suggest_hours(&self, context: &HoursContext<'_>) -> MediatorOutcome<HoursBand> {
        let request = prompt::hours_request(context, self.timeout);
        self.request(request, context.allowed).await
    }

    async fn request<C: Choice>(&self, request: LlmRequest, allowed: &[C]) -> MediatorOutcome<C> {
        let started = Instant::now();
        let completion =
            tokio::time::timeout(self.timeout, self.provider.complete(&request)).await;

        let raw = match completion {
            Err(_) => {
                warn!(
                    schema = C::SCHEMA_FIELD,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "llm request exceeded deadline; abandoning"
                );
                return MediatorOutcome::TimedOut {
                    after: self.timeout,
                };
            }
            Ok(Err(ProviderError::Disabled)) => return MediatorOutcome::Disabled,
            Ok(Err(err)) => {
                warn!(schema = C::SCHEMA_FIELD, error = %err, "llm provider unavailable");
                return MediatorOutcome::Unavailable(err.to_string());
            }
            Ok(Ok(raw)) => raw,
        };

        match schema::parse_suggestion(&raw, allowed) {
            Ok(suggestion) => {
                info!(
                    schema = C::SCHEMA_FIELD,
                    choice = suggestion.choice.choice_id(),
                    confidence = suggestion.confidence,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "llm suggestion accepted"
                );
                MediatorOutcome::Suggested(suggestion)
            }
            Err(rejection) => {
                warn!(schema = C::SCHEMA_FIELD, %rejection, "llm suggestion rejected");
                MediatorOutcome::Rejected(rejection)
            }
        }
    }
}
