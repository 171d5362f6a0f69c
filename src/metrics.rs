use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct QaMetrics {
    documents_ingested: AtomicU64,
    chunks_ingested: AtomicU64,
    questions_answered: AtomicU64,
    fallback_selections: AtomicU64,
}

impl QaMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a registered document and the number of chunks it produced.
    pub fn record_document(&self, chunk_count: u64) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        self.chunks_ingested
            .fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a completed answer.
    pub fn record_answer(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a relevance selection that degraded to the fallback path.
    pub fn record_fallback_selection(&self) {
        self.fallback_selections.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            chunks_ingested: self.chunks_ingested.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            fallback_selections: self.fallback_selections.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents registered since startup.
    pub documents_ingested: u64,
    /// Total chunk count produced across registered documents.
    pub chunks_ingested: u64,
    /// Number of questions answered end-to-end.
    pub questions_answered: u64,
    /// Number of relevance selections that used the fallback path.
    pub fallback_selections: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_chunks() {
        let metrics = QaMetrics::new();
        metrics.record_document(2);
        metrics.record_document(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_ingested, 2);
        assert_eq!(snapshot.chunks_ingested, 5);
    }

    #[test]
    fn records_answers_and_fallbacks() {
        let metrics = QaMetrics::new();
        metrics.record_answer();
        metrics.record_fallback_selection();
        metrics.record_answer();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.questions_answered, 2);
        assert_eq!(snapshot.fallback_selections, 1);
    }
}
