//! Core data types and error definitions for the question-answering pipeline.

use crate::extraction::ExtractionError;
use crate::generation::GenerationClientError;
use crate::tokenizer::TokenizerError;
use std::collections::BTreeMap;
use thiserror::Error;

/// Identifier of one stored chunk, unique within a session.
///
/// Equals the source document's display name when the document produced a
/// single chunk, `"<name> (Part i/n)"` otherwise. Never regenerated for the
/// same ingestion.
pub type ChunkId = String;

/// One token-bounded slice of a document's extracted text.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Stable identifier assigned at ingestion.
    pub id: ChunkId,
    /// Immutable chunk text.
    pub text: String,
    /// Authoritative token count, computed through the tokenizer.
    pub token_count: usize,
}

/// A chunk produced by the ingestor, before identifiers are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDraft {
    /// Chunk text.
    pub text: String,
    /// Token count recomputed through the tokenizer.
    pub token_count: usize,
}

/// How to treat a document whose name is already registered.
///
/// The store never decides this implicitly; callers state their intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPolicy {
    /// Leave the stored document untouched and report the ingestion skipped.
    SkipExisting,
    /// Replace the stored document's chunks and summaries.
    Reprocess,
}

/// Summary of a completed registration.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Identifiers assigned (or already held) by the document's chunks.
    pub chunk_ids: Vec<ChunkId>,
    /// Number of chunks the document occupies in the store.
    pub chunk_count: usize,
    /// Whether the ingestion was skipped under [`IngestPolicy::SkipExisting`].
    pub skipped_existing: bool,
}

/// Relevance scores keyed by chunk identifier, produced fresh per question.
pub type RelevanceScores = BTreeMap<ChunkId, f64>;

/// Result of relevance selection, split by how trustworthy the ranking is.
///
/// The two branches keep a degraded ranking distinguishable from a confident
/// one: a malformed model reply falls back deterministically instead of
/// masquerading as a unanimous zero score.
#[derive(Debug, Clone)]
pub enum SelectionOutcome {
    /// The model reply parsed and scored at least one known chunk.
    Ranked {
        /// Arg-max chunk; ties break to the earliest entry in the supplied
        /// summaries order.
        chosen: ChunkId,
        /// Full parsed score mapping, as returned by the model.
        scores: RelevanceScores,
    },
    /// The model reply was unusable; a deterministic fallback was applied.
    Fallback {
        /// First chunk in the supplied summaries order.
        chosen: ChunkId,
        /// Every known chunk mapped to zero.
        scores: RelevanceScores,
        /// Diagnostic describing why the reply was rejected.
        reason: String,
    },
}

impl SelectionOutcome {
    /// Identifier of the selected chunk.
    pub fn chosen(&self) -> &str {
        match self {
            Self::Ranked { chosen, .. } | Self::Fallback { chosen, .. } => chosen,
        }
    }

    /// Score mapping backing the selection.
    pub fn scores(&self) -> &RelevanceScores {
        match self {
            Self::Ranked { scores, .. } | Self::Fallback { scores, .. } => scores,
        }
    }

    /// Whether the fallback path produced this outcome.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Result of the end-to-end question flow.
#[derive(Debug, Clone)]
pub struct AskOutcome {
    /// Chunk whose text grounded the answer.
    pub chosen: ChunkId,
    /// Relevance scores backing the selection.
    pub scores: RelevanceScores,
    /// Whether selection fell back on a malformed model reply.
    pub degraded: bool,
    /// Generated answer text.
    pub answer: String,
}

/// Errors produced while splitting text into token-bounded chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Caller supplied an impossible token budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Tokenizer failed to encode or decode the text.
    #[error("tokenizer failure during chunking: {0}")]
    Tokenizer(#[from] TokenizerError),
}

/// Errors emitted by the ingestion side of the pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Text extraction from the binary document failed.
    #[error("Failed to extract document text: {0}")]
    Extraction(#[from] ExtractionError),
    /// Chunking failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// The summarization call failed; the store is left unchanged.
    #[error("Failed to summarize chunk: {0}")]
    Generation(#[from] GenerationClientError),
    /// Chunk texts and token counts had different lengths.
    #[error("chunk texts and token counts disagree: {chunks} texts, {counts} counts")]
    CountMismatch {
        /// Number of chunk texts supplied.
        chunks: usize,
        /// Number of token counts supplied.
        counts: usize,
    },
}

/// Errors emitted by relevance selection.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// Selection requires at least one registered chunk.
    #[error("no documents available for relevance selection")]
    NoDocumentsAvailable,
    /// The scoring call itself failed.
    #[error("Failed to score documents: {0}")]
    Generation(#[from] GenerationClientError),
}

/// Errors emitted by the end-to-end question flow.
#[derive(Debug, Error)]
pub enum QuestionError {
    /// Relevance selection failed.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// Answer generation failed.
    #[error("Failed to generate answer: {0}")]
    Generation(#[from] GenerationClientError),
    /// The selected chunk disappeared between selection and lookup.
    #[error("selected chunk '{id}' is not in the store")]
    MissingChunk {
        /// Identifier that failed to resolve.
        id: ChunkId,
    },
}
