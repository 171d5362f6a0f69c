//! Question-answering pipeline: chunking, summarization, relevance
//! selection and grounded answer generation.

pub mod answer;
pub mod chunking;
pub mod ingest;
pub mod selection;
mod service;
pub mod store;
pub mod summarize;
pub mod types;

pub use service::{QaApi, QaService};
pub use store::{ChunkRecord, DocumentStore, InsertOutcome};
pub use types::{
    AskOutcome, Chunk, ChunkDraft, ChunkId, ChunkingError, IngestError, IngestOutcome,
    IngestPolicy, QuestionError, RelevanceScores, SelectionError, SelectionOutcome,
};
