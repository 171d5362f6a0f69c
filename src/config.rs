//! Configuration loading for the Doc QA server.
//!
//! Two sources are combined at startup:
//!
//! - Environment variables (`.env` supported via `dotenvy`) for deployment
//!   concerns: the generation endpoint, API key, model name and server port.
//! - A JSON configuration document for pipeline tuning: the
//!   `document_processing.max_chunk_tokens` budget and one block per agent
//!   (`document_analysis_agent`, `researcher_agent`, `reply_agent`) holding
//!   `{ system_prompt, model_prompt, temperature, max_tokens }`.
//!
//! The result is a typed [`Config`] loaded once and handed to constructors
//! explicitly; nothing reads configuration ambiently at call time.

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default location of the JSON configuration document.
pub const DEFAULT_CONFIG_PATH: &str = "config/docqa.json";

/// Errors encountered while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// The configuration document could not be read.
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        /// Path we attempted to read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration document was not valid JSON of the expected shape.
    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        /// Path of the offending document.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Connection settings for the text-generation endpoint.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible chat-completions server.
    pub endpoint: String,
    /// Optional bearer token sent with every request.
    pub api_key: Option<String>,
    /// Model identifier passed through to the endpoint.
    pub model: String,
}

/// Prompting and sampling settings for one pipeline agent.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// System role installed for every call made by this agent.
    pub system_prompt: String,
    /// Prompt template the agent's input text is appended to.
    pub model_prompt: String,
    /// Sampling temperature forwarded to the generation endpoint.
    pub temperature: f32,
    /// Output token budget forwarded to the generation endpoint.
    pub max_tokens: u32,
}

/// Document processing tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentProcessingConfig {
    /// Upper bound on tokens per chunk produced at ingestion.
    pub max_chunk_tokens: usize,
}

/// The three agent configurations used by the pipeline.
#[derive(Debug, Clone)]
pub struct AgentsConfig {
    /// Builds per-chunk appendices at ingestion time.
    pub document_analysis: AgentConfig,
    /// Scores appendices against a question.
    pub researcher: AgentConfig,
    /// Produces the grounded answer.
    pub reply: AgentConfig,
}

/// Runtime configuration for the Doc QA server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Generation endpoint settings.
    pub generation: GenerationConfig,
    /// Chunking budget.
    pub document_processing: DocumentProcessingConfig,
    /// Per-agent prompting settings.
    pub agents: AgentsConfig,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// On-disk shape of the JSON configuration document.
#[derive(Debug, Deserialize)]
struct FileConfig {
    document_processing: DocumentProcessingConfig,
    document_analysis_agent: AgentConfig,
    researcher_agent: AgentConfig,
    reply_agent: AgentConfig,
}

impl Config {
    /// Load configuration from the environment and the JSON document.
    ///
    /// `path_override` wins over `DOCQA_CONFIG`, which wins over
    /// [`DEFAULT_CONFIG_PATH`].
    pub fn load(path_override: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path_override {
            Some(path) => path.to_path_buf(),
            None => load_env_optional("DOCQA_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
        };
        let file = Self::read_file(&path)?;

        Ok(Self {
            generation: GenerationConfig {
                endpoint: load_env("GENERATION_ENDPOINT")?,
                api_key: load_env_optional("GENERATION_API_KEY"),
                model: load_env("GENERATION_MODEL")?,
            },
            document_processing: file.document_processing,
            agents: AgentsConfig {
                document_analysis: file.document_analysis_agent,
                researcher: file.researcher_agent,
                reply: file.reply_agent,
            },
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }

    fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "document_processing": { "max_chunk_tokens": 1500 },
        "document_analysis_agent": {
            "system_prompt": "Build a compact appendix.",
            "model_prompt": "Describe the following text:\n\n",
            "temperature": 0.3,
            "max_tokens": 300
        },
        "researcher_agent": {
            "system_prompt": "Score each document.",
            "model_prompt": "Documents:\n",
            "temperature": 0.0,
            "max_tokens": 500
        },
        "reply_agent": {
            "system_prompt": "Answer from the text only.",
            "model_prompt": "Answer using only this document:\n\n",
            "temperature": 0.2,
            "max_tokens": 800
        }
    }"#;

    #[test]
    fn parses_agent_blocks() {
        let file: FileConfig = serde_json::from_str(SAMPLE).expect("valid document");
        assert_eq!(file.document_processing.max_chunk_tokens, 1500);
        assert_eq!(
            file.document_analysis_agent.system_prompt,
            "Build a compact appendix."
        );
        assert!((file.researcher_agent.temperature - 0.0).abs() < f32::EPSILON);
        assert_eq!(file.reply_agent.max_tokens, 800);
    }

    #[test]
    fn rejects_document_missing_an_agent() {
        let truncated = r#"{ "document_processing": { "max_chunk_tokens": 100 } }"#;
        let result: Result<FileConfig, _> = serde_json::from_str(truncated);
        assert!(result.is_err());
    }
}
