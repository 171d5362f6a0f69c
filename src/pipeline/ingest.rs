//! Document ingestion: raw text to chunk drafts.

use super::chunking::split_text;
use super::types::{ChunkDraft, ChunkingError};
use crate::tokenizer::Tokenizer;

/// Turns a document's extracted text into token-bounded chunk drafts.
pub struct DocumentIngestor {
    tokenizer: Tokenizer,
    max_chunk_tokens: usize,
}

impl DocumentIngestor {
    /// Build an ingestor around the shared tokenizer and the configured
    /// per-chunk token budget.
    pub fn new(tokenizer: Tokenizer, max_chunk_tokens: usize) -> Self {
        Self {
            tokenizer,
            max_chunk_tokens,
        }
    }

    /// Chunk a document's raw text.
    ///
    /// A document at or under the budget stays whole; anything larger is
    /// split on token boundaries. Each draft's token count is recomputed
    /// through the tokenizer rather than inferred from the split, so the
    /// counts stay authoritative even if the splitter's internal accounting
    /// ever diverges.
    pub fn ingest(&self, raw_text: &str) -> Result<Vec<ChunkDraft>, ChunkingError> {
        let total = self.tokenizer.count_tokens(raw_text);
        if total <= self.max_chunk_tokens {
            return Ok(vec![ChunkDraft {
                text: raw_text.to_string(),
                token_count: total,
            }]);
        }

        let chunks = split_text(&self.tokenizer, raw_text, self.max_chunk_tokens)?;
        tracing::debug!(
            total_tokens = total,
            max_chunk_tokens = self.max_chunk_tokens,
            chunks = chunks.len(),
            "Split document into chunks"
        );
        Ok(chunks
            .into_iter()
            .map(|text| {
                let token_count = self.tokenizer.count_tokens(&text);
                ChunkDraft { text, token_count }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingestor(max_chunk_tokens: usize) -> DocumentIngestor {
        DocumentIngestor::new(Tokenizer::new().expect("load encoding"), max_chunk_tokens)
    }

    #[test]
    fn document_under_budget_stays_whole() {
        let ingestor = ingestor(100);
        let drafts = ingestor.ingest("The sky is blue.").expect("ingest");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].text, "The sky is blue.");
        assert!(drafts[0].token_count <= 100);
    }

    #[test]
    fn document_over_budget_splits_into_ceil_chunks() {
        let max_chunk_tokens = 4;
        let ingestor = ingestor(max_chunk_tokens);
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let total = Tokenizer::new().expect("encoding").count_tokens(text);
        assert!(total > max_chunk_tokens);

        let drafts = ingestor.ingest(text).expect("ingest");
        assert_eq!(drafts.len(), total.div_ceil(max_chunk_tokens));
        let stitched: String = drafts.iter().map(|draft| draft.text.as_str()).collect();
        assert_eq!(stitched, text);
    }

    #[test]
    fn draft_counts_are_recomputed_per_chunk() {
        let ingestor = ingestor(3);
        let tokenizer = Tokenizer::new().expect("encoding");
        let drafts = ingestor
            .ingest("one two three four five six seven")
            .expect("ingest");
        for draft in &drafts {
            assert_eq!(draft.token_count, tokenizer.count_tokens(&draft.text));
            assert!(draft.token_count >= 1 && draft.token_count <= 3);
        }
    }

    #[test]
    fn empty_document_is_a_single_empty_draft() {
        let drafts = ingestor(10).ingest("").expect("ingest");
        assert_eq!(
            drafts,
            vec![ChunkDraft {
                text: String::new(),
                token_count: 0,
            }]
        );
    }
}
