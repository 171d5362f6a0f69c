//! Text-generation client abstraction and the OpenAI-compatible adapter.
//!
//! Every LLM interaction in the pipeline (appendix building, relevance
//! scoring, answer generation) goes through [`GenerationClient`] with a
//! per-agent system role, prompt, temperature and output budget. The default
//! adapter speaks the `/v1/chat/completions` wire format so it works against
//! hosted OpenAI-style deployments as well as local runtimes exposing the
//! same surface.

use crate::config::GenerationConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the text-generation capability.
#[derive(Debug, Error)]
pub enum GenerationClientError {
    /// Endpoint was unreachable or does not serve the expected route.
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Endpoint returned an error response.
    #[error("Failed to generate text: {0}")]
    GenerationFailed(String),
    /// Endpoint response could not be decoded.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// One generation call as issued by a pipeline agent.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// System role installed for the call.
    pub system_prompt: String,
    /// Fully assembled user prompt.
    pub user_prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token budget.
    pub max_tokens: u32,
}

/// Interface implemented by text-generation backends.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Produce a completion for the supplied request.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<String, GenerationClientError>;
}

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct ChatCompletionsClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl ChatCompletionsClient {
    /// Build a client from generation settings.
    pub fn new(config: &GenerationConfig) -> Self {
        let http = Client::builder()
            .user_agent("docqa/generation")
            .build()
            .expect("Failed to construct reqwest::Client for generation");
        Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.endpoint.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl GenerationClient for ChatCompletionsClient {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<String, GenerationClientError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_prompt }
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": false,
        });

        let mut builder = self.http.post(self.completions_url()).json(&payload);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|error| {
            GenerationClientError::ProviderUnavailable(format!(
                "failed to reach generation endpoint {}: {error}",
                self.endpoint
            ))
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GenerationClientError::ProviderUnavailable(format!(
                "generation endpoint {} returned 404",
                self.completions_url()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationClientError::GenerationFailed(format!(
                "generation endpoint returned {status}: {body}"
            )));
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|error| {
            GenerationClientError::InvalidResponse(format!(
                "failed to decode chat completion: {error}"
            ))
        })?;

        let choice = body.choices.into_iter().next().ok_or_else(|| {
            GenerationClientError::InvalidResponse("chat completion carried no choices".into())
        })?;

        Ok(choice.message.content.trim().to_string())
    }
}
