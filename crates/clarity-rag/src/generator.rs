//! OpenAI-compatible chat completions backend.
//!
//! The hosted API and a locally served model (Ollama and friends) speak the
//! same protocol; they differ only in endpoint and key.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use clarity_core::config::{LlmBackend, LlmSettings};
use clarity_core::timeout::with_deadline;
use clarity_core::traits::AnswerGenerator;
use clarity_core::{BackendFailure, Error, Result};

pub const HOSTED_BASE_URL: &str = "https://api.openai.com/v1";
pub const LOCAL_BASE_URL: &str = "http://localhost:11434/v1";
/// Local servers ignore the key but the protocol requires one.
pub const LOCAL_API_KEY: &str = "ollama";

pub struct ChatCompletionsGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    deadline: Option<Duration>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn backend_error(kind: BackendFailure, message: String) -> Error {
    Error::GenerationBackend { kind, message }
}

impl ChatCompletionsGenerator {
    pub fn hosted(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_endpoint(HOSTED_BASE_URL, api_key, model)
    }

    pub fn local(model: impl Into<String>) -> Self {
        Self::with_endpoint(LOCAL_BASE_URL, LOCAL_API_KEY, model)
    }

    pub fn with_endpoint(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            deadline: None,
        }
    }

    /// Build the configured backend for `model`. The hosted backend reads its
    /// key from `OPENAI_API_KEY`.
    pub fn from_settings(settings: &LlmSettings, model: &str) -> Result<Self> {
        let generator = match settings.backend {
            LlmBackend::Hosted => {
                let key = std::env::var("OPENAI_API_KEY")
                    .map_err(|_| Error::InvalidConfig("OPENAI_API_KEY environment variable not set".into()))?;
                Self::hosted(key, model)
            }
            LlmBackend::Local => Self::local(model),
        };
        let generator = match &settings.base_url {
            Some(url) => generator.with_base_url(url),
            None => generator,
        };
        Ok(generator.with_deadline(Duration::from_secs(settings.timeout_secs)))
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let endpoint = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest { model: &self.model, messages: [ChatMessage { role: "user", content: prompt }] };
        debug!(model = %self.model, prompt_len = prompt.len(), "chat completion");

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(endpoint = %endpoint, error = %e, "generation backend unreachable");
                backend_error(BackendFailure::Unreachable, format!("request to {endpoint} failed: {e}"))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| backend_error(BackendFailure::Unreachable, format!("failed to read response: {e}")))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
            error!(model = %self.model, %status, "generation backend rejected the call");
            return Err(backend_error(BackendFailure::Rejected, format!("API returned {status}: {detail}")));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            error!(model = %self.model, error = %e, "failed to parse completion");
            backend_error(BackendFailure::InvalidResponse, format!("failed to parse response: {e}"))
        })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| backend_error(BackendFailure::InvalidResponse, "response carried no completion".into()))
    }
}

#[async_trait]
impl AnswerGenerator for ChatCompletionsGenerator {
    fn model(&self) -> &str { &self.model }

    async fn generate(&self, prompt: &str) -> Result<String> {
        with_deadline("generation", self.deadline, self.complete(prompt)).await
    }
}
