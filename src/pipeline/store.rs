//! Session-scoped in-memory registry of chunks and their appendices.
//!
//! The store is owned by the calling session context and passed by reference
//! into each pipeline operation; it is never ambient state. It grows as
//! documents are registered and is discarded with the session.

use super::types::{Chunk, ChunkId, IngestPolicy};
use std::collections::HashMap;

/// Fully summarized chunk data ready for registration.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// Chunk text.
    pub text: String,
    /// Authoritative token count.
    pub token_count: usize,
    /// Appendix produced by the summarizer.
    pub summary: String,
}

/// Result of committing a document to the store.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    /// The document's chunks were added under the returned identifiers.
    Inserted(Vec<ChunkId>),
    /// The document was already present and the caller asked to keep it.
    SkippedExisting(Vec<ChunkId>),
}

/// Insertion-ordered registry mapping chunk identifiers to chunk text,
/// token count and appendix.
///
/// Chunk text and token counts are immutable once registered; appendices may
/// be overwritten afterwards through [`DocumentStore::set_summary`].
#[derive(Debug, Default)]
pub struct DocumentStore {
    order: Vec<ChunkId>,
    chunks: HashMap<ChunkId, Chunk>,
    summaries: HashMap<ChunkId, String>,
    documents: HashMap<String, Vec<ChunkId>>,
}

impl DocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks currently registered.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether a document with this display name has been registered.
    pub fn has_document(&self, name: &str) -> bool {
        self.documents.contains_key(name)
    }

    /// Identifiers registered under a document name, in part order.
    pub fn document_chunks(&self, name: &str) -> Option<&[ChunkId]> {
        self.documents.get(name).map(Vec::as_slice)
    }

    /// Commit a fully summarized document in one step.
    ///
    /// Identifiers follow the naming rule: the document name itself for a
    /// single-chunk document, `"<name> (Part i/n)"` with 1-based `i`
    /// otherwise. A name collision is resolved by the caller's explicit
    /// policy; under [`IngestPolicy::Reprocess`] the previous chunks are
    /// replaced and the new ones take their place at the end of the
    /// insertion order.
    pub fn insert_document(
        &mut self,
        name: &str,
        records: Vec<ChunkRecord>,
        policy: IngestPolicy,
    ) -> InsertOutcome {
        if let Some(existing) = self.documents.get(name) {
            match policy {
                IngestPolicy::SkipExisting => {
                    return InsertOutcome::SkippedExisting(existing.clone());
                }
                IngestPolicy::Reprocess => self.remove_document(name),
            }
        }

        let total = records.len();
        let mut ids = Vec::with_capacity(total);
        for (index, record) in records.into_iter().enumerate() {
            let id = chunk_id(name, index, total);
            self.order.push(id.clone());
            self.summaries.insert(id.clone(), record.summary);
            self.chunks.insert(
                id.clone(),
                Chunk {
                    id: id.clone(),
                    text: record.text,
                    token_count: record.token_count,
                },
            );
            ids.push(id);
        }
        self.documents.insert(name.to_string(), ids.clone());
        InsertOutcome::Inserted(ids)
    }

    fn remove_document(&mut self, name: &str) {
        if let Some(ids) = self.documents.remove(name) {
            for id in &ids {
                self.chunks.remove(id);
                self.summaries.remove(id);
            }
            self.order.retain(|id| !ids.contains(id));
        }
    }

    /// Look up a chunk by identifier.
    pub fn chunk(&self, id: &str) -> Option<&Chunk> {
        self.chunks.get(id)
    }

    /// Look up a chunk's appendix by identifier.
    pub fn summary(&self, id: &str) -> Option<&str> {
        self.summaries.get(id).map(String::as_str)
    }

    /// Overwrite a chunk's appendix, e.g. after human curation.
    ///
    /// Returns `false` when the identifier is unknown.
    pub fn set_summary(&mut self, id: &str, summary: String) -> bool {
        if !self.chunks.contains_key(id) {
            return false;
        }
        self.summaries.insert(id.to_string(), summary);
        true
    }

    /// All `(identifier, appendix)` pairs in insertion order.
    pub fn summaries(&self) -> Vec<(ChunkId, String)> {
        self.order
            .iter()
            .filter_map(|id| {
                self.summaries
                    .get(id)
                    .map(|summary| (id.clone(), summary.clone()))
            })
            .collect()
    }

    /// All `(identifier, token count)` pairs in insertion order, for display.
    ///
    /// The chunk itself remains the single source of truth for the count.
    pub fn token_counts(&self) -> Vec<(ChunkId, usize)> {
        self.order
            .iter()
            .filter_map(|id| self.chunks.get(id).map(|chunk| (id.clone(), chunk.token_count)))
            .collect()
    }

    /// Iterate chunks with their appendices in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&Chunk, &str)> {
        self.order.iter().filter_map(|id| {
            let chunk = self.chunks.get(id)?;
            let summary = self.summaries.get(id)?;
            Some((chunk, summary.as_str()))
        })
    }
}

fn chunk_id(name: &str, index: usize, total: usize) -> ChunkId {
    if total == 1 {
        name.to_string()
    } else {
        format!("{} (Part {}/{})", name, index + 1, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str, token_count: usize, summary: &str) -> ChunkRecord {
        ChunkRecord {
            text: text.to_string(),
            token_count,
            summary: summary.to_string(),
        }
    }

    #[test]
    fn single_chunk_document_keeps_its_name() {
        let mut store = DocumentStore::new();
        let outcome = store.insert_document(
            "report.pdf",
            vec![record("The sky is blue.", 5, "Describes sky color.")],
            IngestPolicy::SkipExisting,
        );
        let InsertOutcome::Inserted(ids) = outcome else {
            panic!("expected insertion");
        };
        assert_eq!(ids, vec!["report.pdf".to_string()]);
        assert_eq!(store.chunk("report.pdf").expect("chunk").token_count, 5);
        assert_eq!(store.summary("report.pdf"), Some("Describes sky color."));
    }

    #[test]
    fn multi_chunk_document_is_numbered() {
        let mut store = DocumentStore::new();
        store.insert_document(
            "manual.pdf",
            vec![
                record("part one", 2, "first"),
                record("part two", 2, "second"),
                record("part three", 2, "third"),
            ],
            IngestPolicy::SkipExisting,
        );
        assert_eq!(store.len(), 3);
        assert!(store.chunk("manual.pdf (Part 1/3)").is_some());
        assert!(store.chunk("manual.pdf (Part 3/3)").is_some());
        assert!(store.chunk("manual.pdf").is_none());
    }

    #[test]
    fn skip_existing_leaves_prior_chunks_untouched() {
        let mut store = DocumentStore::new();
        store.insert_document(
            "a.pdf",
            vec![record("old text", 2, "old summary")],
            IngestPolicy::SkipExisting,
        );
        let outcome = store.insert_document(
            "a.pdf",
            vec![record("new text", 3, "new summary")],
            IngestPolicy::SkipExisting,
        );
        assert!(matches!(outcome, InsertOutcome::SkippedExisting(ids) if ids == ["a.pdf"]));
        assert_eq!(store.chunk("a.pdf").expect("chunk").text, "old text");
    }

    #[test]
    fn reprocess_replaces_prior_chunks() {
        let mut store = DocumentStore::new();
        store.insert_document(
            "a.pdf",
            vec![record("one", 1, "s1"), record("two", 1, "s2")],
            IngestPolicy::SkipExisting,
        );
        store.insert_document(
            "a.pdf",
            vec![record("fresh", 1, "s3")],
            IngestPolicy::Reprocess,
        );
        assert_eq!(store.len(), 1);
        assert!(store.chunk("a.pdf (Part 1/2)").is_none());
        assert_eq!(store.chunk("a.pdf").expect("chunk").text, "fresh");
    }

    #[test]
    fn summaries_preserve_insertion_order() {
        let mut store = DocumentStore::new();
        store.insert_document(
            "z.pdf",
            vec![record("zz", 1, "last alphabetically, first inserted")],
            IngestPolicy::SkipExisting,
        );
        store.insert_document(
            "a.pdf",
            vec![record("aa", 1, "first alphabetically, second inserted")],
            IngestPolicy::SkipExisting,
        );
        let summaries = store.summaries();
        assert_eq!(summaries[0].0, "z.pdf");
        assert_eq!(summaries[1].0, "a.pdf");
    }

    #[test]
    fn set_summary_edits_appendix_only() {
        let mut store = DocumentStore::new();
        store.insert_document(
            "a.pdf",
            vec![record("text", 1, "machine summary")],
            IngestPolicy::SkipExisting,
        );
        assert!(store.set_summary("a.pdf", "curated summary".into()));
        assert_eq!(store.summary("a.pdf"), Some("curated summary"));
        assert_eq!(store.chunk("a.pdf").expect("chunk").text, "text");
        assert!(!store.set_summary("missing.pdf", "ignored".into()));
    }

    #[test]
    fn token_counts_mirror_chunks() {
        let mut store = DocumentStore::new();
        store.insert_document(
            "a.pdf",
            vec![record("one", 7, "s1"), record("two", 9, "s2")],
            IngestPolicy::SkipExisting,
        );
        let counts = store.token_counts();
        assert_eq!(
            counts,
            vec![
                ("a.pdf (Part 1/2)".to_string(), 7),
                ("a.pdf (Part 2/2)".to_string(), 9),
            ]
        );
    }
}
