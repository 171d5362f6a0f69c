//! Per-chunk appendix building.

use crate::config::AgentConfig;
use crate::generation::{GenerationClient, GenerationClientError, GenerationRequest};
use std::sync::Arc;

/// Builds the compact appendix stored alongside each chunk.
///
/// Appendices exist solely so relevance matching can work over short texts
/// instead of full chunks; they are never used as answer grounding. One
/// generation call per chunk, no retry, no output validation — whatever the
/// model returns is the appendix.
pub struct Summarizer {
    client: Arc<dyn GenerationClient>,
    agent: AgentConfig,
}

impl Summarizer {
    /// Build a summarizer from the `document_analysis_agent` configuration.
    pub fn new(client: Arc<dyn GenerationClient>, agent: AgentConfig) -> Self {
        Self { client, agent }
    }

    /// Summarize one chunk's text. Failures abort the chunk's ingestion and
    /// propagate to the caller.
    pub async fn summarize(&self, chunk_text: &str) -> Result<String, GenerationClientError> {
        let request = GenerationRequest {
            system_prompt: self.agent.system_prompt.clone(),
            user_prompt: format!("{}{}", self.agent.model_prompt, chunk_text),
            temperature: self.agent.temperature,
            max_tokens: self.agent.max_tokens,
        };
        self.client.generate(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::test_support::ScriptedClient;

    fn agent() -> AgentConfig {
        AgentConfig {
            system_prompt: "Build a compact appendix.".into(),
            model_prompt: "Describe the following text:\n\n".into(),
            temperature: 0.3,
            max_tokens: 300,
        }
    }

    #[tokio::test]
    async fn appends_chunk_text_to_the_template() {
        let client = Arc::new(ScriptedClient::replying(["Describes sky color."]));
        let summarizer = Summarizer::new(client.clone(), agent());

        let summary = summarizer.summarize("The sky is blue.").await.expect("summary");
        assert_eq!(summary, "Describes sky color.");

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system_prompt, "Build a compact appendix.");
        assert_eq!(
            calls[0].user_prompt,
            "Describe the following text:\n\nThe sky is blue."
        );
        assert_eq!(calls[0].max_tokens, 300);
    }

    #[tokio::test]
    async fn propagates_generation_failure() {
        let client = Arc::new(ScriptedClient::new([Err(
            GenerationClientError::GenerationFailed("endpoint returned 500".into()),
        )]));
        let summarizer = Summarizer::new(client, agent());

        let error = summarizer.summarize("text").await.expect_err("failure");
        assert!(matches!(error, GenerationClientError::GenerationFailed(_)));
    }
}
