use serde_json::{json, Value};
use tracing::debug;

use super::provider::{LlmProvider, LlmRequest, ProviderError};

/// Provider for OpenAI-compatible chat completion endpoints.
///
/// `ureq` is blocking, so each call runs on the blocking pool. If the mediator deadline fires
/// first the join handle is dropped and the late response is discarded.
#[derive(Debug, Clone)]
pub struct HttpLlmProvider {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpLlmProvider {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(concat!("care-tier/", env!("CARGO_PKG_VERSION")))
            .build();

        Self {
            agent,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn payload(&self, request: &LlmRequest) -> Value {
        json!({
            "model": self.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
        })
    }
}

impl LlmProvider for HttpLlmProvider {
    async fn complete(&self, request: &LlmRequest) -> Result<String, ProviderError> {
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();
        let payload = self.payload(request);
        let deadline = request.deadline;

        debug!(endpoint = %endpoint, model = %self.model, "dispatching llm request");

        // The mediator drops this future at `deadline`; the ureq timeout uses the same
        // duration so the orphaned blocking thread is released at about the same time.
        tokio::task::spawn_blocking(move || {
            let mut call = agent
                .post(&endpoint)
                .timeout(deadline)
                .set("Content-Type", "application/json")
                .set("Accept", "application/json");
            if let Some(key) = api_key.as_deref() {
                call = call.set("Authorization", &format!("Bearer {key}"));
            }

            let response = call.send_json(payload).map_err(provider_error_from_ureq)?;
            let body: Value = response
                .into_json()
                .map_err(|err| ProviderError::Transport(err.to_string()))?;
            completion_text(&body).ok_or(ProviderError::EmptyCompletion)
        })
        .await
        .map_err(|err| ProviderError::Aborted(err.to_string()))?
    }
}

fn provider_error_from_ureq(err: ureq::Error) -> ProviderError {
    match err {
        ureq::Error::Status(status, _) => ProviderError::Status(status),
        ureq::Error::Transport(transport) => ProviderError::Transport(transport.to_string()),
    }
}

fn completion_text(body: &Value) -> Option<String> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn extracts_first_choice_content() {
        let body = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "{\"category\":\"in_home\"}" } }
            ]
        });

        assert_eq!(
            completion_text(&body).as_deref(),
            Some("{\"category\":\"in_home\"}")
        );
    }

    #[test]
    fn blank_completion_is_missing() {
        let body = json!({ "choices": [ { "message": { "content": "   " } } ] });
        assert!(completion_text(&body).is_none());
        assert!(completion_text(&json!({})).is_none());
    }

    #[test]
    fn payload_carries_both_prompt_segments() {
        let provider =
            HttpLlmProvider::new("http://localhost:9/v1/chat/completions", "test-model")
                .with_api_key("secret");
        let payload = provider.payload(&LlmRequest {
            system: "system text".to_string(),
            prompt: "user text".to_string(),
            deadline: Duration::from_secs(1),
        });

        assert_eq!(payload["model"], "test-model");
        assert_eq!(payload["messages"][0]["content"], "system text");
        assert_eq!(payload["messages"][1]["role"], "user");
    }

    #[tokio::test]
    async fn silent_endpoint_is_released_at_the_request_deadline() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let endpoint = format!(
            "http://{}/v1/chat/completions",
            listener.local_addr().expect("listener address")
        );
        let provider = HttpLlmProvider::new(endpoint, "test-model");
        let started = std::time::Instant::now();

        let result = provider
            .complete(&LlmRequest {
                system: "system text".to_string(),
                prompt: "user text".to_string(),
                deadline: Duration::from_millis(200),
            })
            .await;

        assert!(matches!(result, Err(ProviderError::Transport(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
        drop(listener);
    }
}
