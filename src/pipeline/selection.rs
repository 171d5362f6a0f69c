//! Relevance selection over chunk appendices.
//!
//! One generation call scores every known chunk against the question; the
//! reply must be a single flat JSON object mapping chunk identifiers to
//! scores in `[0, 100]`. Anything else triggers the deterministic fallback
//! instead of a hard failure, and the degraded outcome stays visible to the
//! caller.

use super::types::{ChunkId, RelevanceScores, SelectionError, SelectionOutcome};
use crate::config::AgentConfig;
use crate::generation::{GenerationClient, GenerationRequest};
use serde_json::json;
use std::sync::Arc;

/// Picks the chunk most likely to answer a question.
pub struct RelevanceSelector {
    client: Arc<dyn GenerationClient>,
    agent: AgentConfig,
}

impl RelevanceSelector {
    /// Build a selector from the `researcher_agent` configuration.
    pub fn new(client: Arc<dyn GenerationClient>, agent: AgentConfig) -> Self {
        Self { client, agent }
    }

    /// Score every summary against the question and pick the arg-max.
    ///
    /// `summaries` is an ordered sequence of `(identifier, appendix)` pairs;
    /// its order defines both the tie-break between equal scores and the
    /// fallback choice. An empty sequence is a hard
    /// [`SelectionError::NoDocumentsAvailable`], never a fallback.
    pub async fn select(
        &self,
        question: &str,
        summaries: &[(ChunkId, String)],
    ) -> Result<SelectionOutcome, SelectionError> {
        if summaries.is_empty() {
            return Err(SelectionError::NoDocumentsAvailable);
        }

        let request = GenerationRequest {
            system_prompt: self.agent.system_prompt.clone(),
            user_prompt: build_prompt(&self.agent.model_prompt, summaries, question),
            temperature: self.agent.temperature,
            max_tokens: self.agent.max_tokens,
        };
        let reply = self.client.generate(request).await?;

        let outcome = match parse_scores(&reply) {
            Ok(scores) if scores.is_empty() => {
                fallback(summaries, "relevance reply was an empty mapping")
            }
            Ok(scores) => match arg_max(summaries, &scores) {
                Some(chosen) => SelectionOutcome::Ranked { chosen, scores },
                None => fallback(summaries, "relevance reply scored no known identifier"),
            },
            Err(error) => fallback(
                summaries,
                &format!("relevance reply was not a flat JSON score map: {error}"),
            ),
        };

        if let SelectionOutcome::Fallback { reason, .. } = &outcome {
            tracing::warn!(reason, "Relevance selection degraded to fallback");
        }
        Ok(outcome)
    }
}

/// Assemble the scoring prompt: template, appendix object, question.
fn build_prompt(template: &str, summaries: &[(ChunkId, String)], question: &str) -> String {
    let mut object = serde_json::Map::new();
    for (id, summary) in summaries {
        object.insert(id.clone(), json!(summary));
    }
    format!(
        "{}{}\n\nQuestion: {}",
        template,
        serde_json::Value::Object(object),
        question
    )
}

/// Parse the model reply as a flat identifier-to-score mapping.
///
/// Replies wrapped in prose or code fences are tolerated by parsing the
/// outermost brace-delimited span.
fn parse_scores(reply: &str) -> Result<RelevanceScores, serde_json::Error> {
    let trimmed = reply.trim();
    let payload = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    };
    serde_json::from_str(payload)
}

/// Arg-max over the known identifiers, ties broken by `summaries` order.
fn arg_max(summaries: &[(ChunkId, String)], scores: &RelevanceScores) -> Option<ChunkId> {
    let mut best: Option<(&ChunkId, f64)> = None;
    for (id, _) in summaries {
        let Some(score) = scores.get(id) else {
            continue;
        };
        match best {
            Some((_, best_score)) if *score <= best_score => {}
            _ => best = Some((id, *score)),
        }
    }
    best.map(|(id, _)| id.clone())
}

fn fallback(summaries: &[(ChunkId, String)], reason: &str) -> SelectionOutcome {
    SelectionOutcome::Fallback {
        chosen: summaries[0].0.clone(),
        scores: summaries.iter().map(|(id, _)| (id.clone(), 0.0)).collect(),
        reason: reason.to_string(),
    }
}
