//! Byte-pair-encoding tokenizer shared by the whole pipeline.
//!
//! Every component that reasons about length does so in tokens, not characters,
//! so a single [`Tokenizer`] handle is constructed at startup and cloned into
//! the pipeline. Encoding resolution mirrors the generation model when
//! possible and falls back to `cl100k_base` for models `tiktoken` does not
//! know about.

use anyhow::Error as BpeError;
use std::sync::Arc;
use thiserror::Error;
use tiktoken_rs::{CoreBPE, cl100k_base, get_bpe_from_model};

/// Errors raised while loading an encoding or decoding token ids.
#[derive(Debug, Error)]
pub enum TokenizerError {
    /// Tokenizer resources were unavailable for the requested encoding.
    #[error("failed to initialize tokenizer for model '{model}': {source}")]
    Init {
        /// Model identifier we attempted to load an encoding for.
        model: String,
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: BpeError,
    },
    /// A token-id sequence could not be decoded back into text.
    #[error("failed to decode token sequence: {0}")]
    Decode(String),
}

/// Deterministic text↔token-id codec backed by a fixed BPE vocabulary.
///
/// Cloning is cheap; all clones share the same loaded vocabulary.
#[derive(Clone)]
pub struct Tokenizer {
    encoding: Arc<CoreBPE>,
}

impl Tokenizer {
    /// Load the `cl100k_base` encoding used by the default generation models.
    pub fn new() -> Result<Self, TokenizerError> {
        let encoding = cl100k_base().map_err(|source| TokenizerError::Init {
            model: "cl100k_base".to_string(),
            source,
        })?;
        Ok(Self {
            encoding: Arc::new(encoding),
        })
    }

    /// Resolve the encoding for a specific model name.
    ///
    /// Unknown models fall back to `cl100k_base` with a warning so that token
    /// accounting keeps flowing even when the generation endpoint serves a
    /// model `tiktoken` has no table for.
    pub fn for_model(model: &str) -> Result<Self, TokenizerError> {
        let normalized = model.trim();
        if normalized.is_empty() {
            return Self::new();
        }
        match get_bpe_from_model(normalized) {
            Ok(encoding) => Ok(Self {
                encoding: Arc::new(encoding),
            }),
            Err(error) => {
                tracing::warn!(
                    model = normalized,
                    error = %error,
                    "Tokenizer model lookup failed; falling back to 'cl100k_base'"
                );
                Self::new()
            }
        }
    }

    /// Encode text into an ordered sequence of token ids.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        self.encoding.encode_ordinary(text)
    }

    /// Decode a token-id sequence back into text.
    pub fn decode(&self, tokens: Vec<u32>) -> Result<String, TokenizerError> {
        self.encoding
            .decode(tokens)
            .map_err(|error| TokenizerError::Decode(error.to_string()))
    }

    /// Count the tokens a text encodes to. Empty text counts zero tokens.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.encoding.encode_ordinary(text).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trips() {
        let tokenizer = Tokenizer::new().expect("load encoding");
        let text = "The quick brown fox jumps over the lazy dog.";
        let tokens = tokenizer.encode(text);
        assert!(!tokens.is_empty());
        let decoded = tokenizer.decode(tokens).expect("decode");
        assert_eq!(decoded, text);
    }

    #[test]
    fn empty_text_counts_zero_tokens() {
        let tokenizer = Tokenizer::new().expect("load encoding");
        assert_eq!(tokenizer.count_tokens(""), 0);
        assert!(tokenizer.encode("").is_empty());
    }

    #[test]
    fn count_matches_encode_length() {
        let tokenizer = Tokenizer::new().expect("load encoding");
        let text = "token accounting must agree with the encoder";
        assert_eq!(tokenizer.count_tokens(text), tokenizer.encode(text).len());
    }

    #[test]
    fn unknown_model_falls_back_to_cl100k() {
        let tokenizer = Tokenizer::for_model("definitely-not-a-model").expect("fallback");
        assert!(tokenizer.count_tokens("hello world") > 0);
    }
}
