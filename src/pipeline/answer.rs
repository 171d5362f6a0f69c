//! Grounded answer generation.

use crate::config::AgentConfig;
use crate::generation::{GenerationClient, GenerationClientError, GenerationRequest};
use std::sync::Arc;

/// Generates the final answer from the selected chunk's text.
///
/// The system role forbids information outside the grounding text and asks
/// for an explicit "I don't know" when the text does not contain the answer.
/// Instruction following is delegated to the model; the reply is not
/// validated against the grounding.
pub struct AnswerGenerator {
    client: Arc<dyn GenerationClient>,
    agent: AgentConfig,
}

impl AnswerGenerator {
    /// Build an answer generator from the `reply_agent` configuration.
    pub fn new(client: Arc<dyn GenerationClient>, agent: AgentConfig) -> Self {
        Self { client, agent }
    }

    /// Answer a question using only the supplied grounding text.
    pub async fn answer(
        &self,
        question: &str,
        grounding_text: &str,
    ) -> Result<String, GenerationClientError> {
        let request = GenerationRequest {
            system_prompt: self.agent.system_prompt.clone(),
            user_prompt: format!(
                "{}{}\n\nQuestion: {}",
                self.agent.model_prompt, grounding_text, question
            ),
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
            system_prompt: "Answer from the text only.".into(),
            model_prompt: "Answer the question using only this document:\n\n".into(),
            temperature: 0.2,
            max_tokens: 800,
        }
    }

    #[tokio::test]
    async fn grounds_the_prompt_in_the_chunk_text() {
        let client = Arc::new(ScriptedClient::replying(["Blue."]));
        let generator = AnswerGenerator::new(client.clone(), agent());

        let answer = generator
            .answer("What color is the sky?", "The sky is blue.")
            .await
            .expect("answer");
        assert_eq!(answer, "Blue.");

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system_prompt, "Answer from the text only.");
        assert_eq!(
            calls[0].user_prompt,
            "Answer the question using only this document:\n\nThe sky is blue.\n\nQuestion: What color is the sky?"
        );
    }

    #[tokio::test]
    async fn propagates_generation_failure() {
        let client = Arc::new(ScriptedClient::new([Err(
            GenerationClientError::ProviderUnavailable("endpoint offline".into()),
        )]));
        let generator = AnswerGenerator::new(client, agent());

        let error = generator
            .answer("question", "grounding")
            .await
            .expect_err("failure");
        assert!(matches!(error, GenerationClientError::ProviderUnavailable(_)));
    }
}
