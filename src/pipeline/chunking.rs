//! Token-bounded text segmentation.
//!
//! Chunk boundaries fall on token boundaries, never on characters or words;
//! a chunk may end mid-word. Every chunk except the last holds exactly
//! `max_tokens` tokens, the last holds whatever remains, and concatenating
//! the chunks reconstructs the original text with no tokens dropped or
//! duplicated.

use super::types::ChunkingError;
use crate::tokenizer::Tokenizer;

/// Split text into ordered, non-overlapping chunks of at most `max_tokens`
/// tokens each.
///
/// Empty input yields an empty sequence. A zero `max_tokens` budget is
/// rejected with [`ChunkingError::InvalidChunkSize`]; negative budgets are
/// unrepresentable.
pub fn split_text(
    tokenizer: &Tokenizer,
    text: &str,
    max_tokens: usize,
) -> Result<Vec<String>, ChunkingError> {
    if max_tokens == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }

    let tokens = tokenizer.encode(text);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let mut chunks = Vec::with_capacity(tokens.len().div_ceil(max_tokens));
    for window in tokens.chunks(max_tokens) {
        chunks.push(tokenizer.decode(window.to_vec())?);
    }
    Ok(chunks)
}
