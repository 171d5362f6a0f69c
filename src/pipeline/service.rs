//! Pipeline service coordinating tokenization, chunking, summarization,
//! relevance selection and answer generation.

use crate::{
    config::Config,
    extraction::extract_pdf_text,
    generation::{ChatCompletionsClient, GenerationClient, GenerationClientError},
    metrics::{MetricsSnapshot, QaMetrics},
    pipeline::{
        answer::AnswerGenerator,
        chunking::split_text,
        ingest::DocumentIngestor,
        selection::RelevanceSelector,
        store::{ChunkRecord, DocumentStore, InsertOutcome},
        summarize::Summarizer,
        types::{
            AskOutcome, ChunkId, ChunkingError, IngestError, IngestOutcome, IngestPolicy,
            QuestionError, SelectionError, SelectionOutcome,
        },
    },
    tokenizer::{Tokenizer, TokenizerError},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Coordinates the full question-answering pipeline.
///
/// The service owns long-lived handles to the tokenizer, the generation
/// client and the metrics registry so every surface reuses the same
/// components. The [`DocumentStore`] is deliberately *not* owned here: it is
/// session state, passed by reference into each operation by whoever owns
/// the session. Construct the service once near process start and share it
/// through an `Arc`.
pub struct QaService {
    tokenizer: Tokenizer,
    max_chunk_tokens: usize,
    ingestor: DocumentIngestor,
    summarizer: Summarizer,
    selector: RelevanceSelector,
    answerer: AnswerGenerator,
    metrics: Arc<QaMetrics>,
}

/// Abstraction over the pipeline used by external surfaces and test stubs.
#[async_trait]
pub trait QaApi: Send + Sync {
    /// Count the tokens a text encodes to.
    fn count_tokens(&self, text: &str) -> usize;

    /// Split text into chunks bounded by the configured token budget.
    fn split_text(&self, text: &str) -> Result<Vec<String>, ChunkingError>;

    /// Extract a PDF's text and chunk it, returning parallel chunk texts and
    /// token counts.
    fn extract_document(&self, bytes: &[u8]) -> Result<(Vec<String>, Vec<usize>), IngestError>;

    /// Summarize one chunk of text into an appendix.
    async fn summarize_text(&self, text: &str) -> Result<String, GenerationClientError>;

    /// Summarize and commit a document's chunks into the store.
    async fn register_document(
        &self,
        store: &mut DocumentStore,
        name: &str,
        chunk_texts: Vec<String>,
        chunk_token_counts: Vec<usize>,
        policy: IngestPolicy,
    ) -> Result<IngestOutcome, IngestError>;

    /// Score summaries against a question and pick the most relevant chunk.
    async fn select_relevant(
        &self,
        question: &str,
        summaries: &[(ChunkId, String)],
    ) -> Result<SelectionOutcome, SelectionError>;

    /// Answer a question from the supplied grounding text alone.
    async fn answer_question(
        &self,
        question: &str,
        grounding_text: &str,
    ) -> Result<String, GenerationClientError>;

    /// Run the full question flow against the store.
    async fn ask(
        &self,
        store: &DocumentStore,
        question: &str,
    ) -> Result<AskOutcome, QuestionError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl QaService {
    /// Build the service with the default chat-completions client.
    pub fn new(config: &Config) -> Result<Self, TokenizerError> {
        let client: Arc<dyn GenerationClient> =
            Arc::new(ChatCompletionsClient::new(&config.generation));
        Self::with_client(config, client)
    }

    /// Build the service around an explicit generation client.
    pub fn with_client(
        config: &Config,
        client: Arc<dyn GenerationClient>,
    ) -> Result<Self, TokenizerError> {
        let tokenizer = Tokenizer::for_model(&config.generation.model)?;
        let max_chunk_tokens = config.document_processing.max_chunk_tokens;
        tracing::info!(
            model = %config.generation.model,
            max_chunk_tokens,
            "Initialized question-answering pipeline"
        );
        Ok(Self {
            ingestor: DocumentIngestor::new(tokenizer.clone(), max_chunk_tokens),
            summarizer: Summarizer::new(client.clone(), config.agents.document_analysis.clone()),
            selector: RelevanceSelector::new(client.clone(), config.agents.researcher.clone()),
            answerer: AnswerGenerator::new(client, config.agents.reply.clone()),
            tokenizer,
            max_chunk_tokens,
            metrics: Arc::new(QaMetrics::new()),
        })
    }

    /// Count the tokens a text encodes to.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.tokenizer.count_tokens(text)
    }

    /// Split text into chunks bounded by the configured token budget.
    pub fn split_text(&self, text: &str) -> Result<Vec<String>, ChunkingError> {
        split_text(&self.tokenizer, text, self.max_chunk_tokens)
    }

    /// Extract a PDF's text and chunk it.
    pub fn extract_document(
        &self,
        bytes: &[u8],
    ) -> Result<(Vec<String>, Vec<usize>), IngestError> {
        let text = extract_pdf_text(bytes)?;
        let drafts = self.ingestor.ingest(&text)?;
        Ok(drafts
            .into_iter()
            .map(|draft| (draft.text, draft.token_count))
            .unzip())
    }

    /// Summarize one chunk of text into an appendix.
    pub async fn summarize_text(&self, text: &str) -> Result<String, GenerationClientError> {
        self.summarizer.summarize(text).await
    }

    /// Summarize and commit a document's chunks into the store.
    ///
    /// All appendices are generated before anything is committed, so a
    /// generation failure leaves the store exactly as it was; partial
    /// documents are never visible. Name collisions follow the caller's
    /// explicit [`IngestPolicy`].
    pub async fn register_document(
        &self,
        store: &mut DocumentStore,
        name: &str,
        chunk_texts: Vec<String>,
        chunk_token_counts: Vec<usize>,
        policy: IngestPolicy,
    ) -> Result<IngestOutcome, IngestError> {
        if chunk_texts.len() != chunk_token_counts.len() {
            return Err(IngestError::CountMismatch {
                chunks: chunk_texts.len(),
                counts: chunk_token_counts.len(),
            });
        }

        if policy == IngestPolicy::SkipExisting {
            if let Some(ids) = store.document_chunks(name) {
                tracing::info!(document = name, "Document already registered; skipping");
                return Ok(IngestOutcome {
                    chunk_ids: ids.to_vec(),
                    chunk_count: ids.len(),
                    skipped_existing: true,
                });
            }
        }

        let mut records = Vec::with_capacity(chunk_texts.len());
        for (text, token_count) in chunk_texts.into_iter().zip(chunk_token_counts) {
            let summary = self.summarizer.summarize(&text).await?;
            records.push(ChunkRecord {
                text,
                token_count,
                summary,
            });
        }

        let chunk_ids = match store.insert_document(name, records, policy) {
            InsertOutcome::Inserted(ids) | InsertOutcome::SkippedExisting(ids) => ids,
        };
        self.metrics.record_document(chunk_ids.len() as u64);
        tracing::info!(
            document = name,
            chunks = chunk_ids.len(),
            "Document registered"
        );
        Ok(IngestOutcome {
            chunk_count: chunk_ids.len(),
            chunk_ids,
            skipped_existing: false,
        })
    }

    /// Chunk a document's raw text and register it in one step.
    pub async fn ingest_document(
        &self,
        store: &mut DocumentStore,
        name: &str,
        raw_text: &str,
        policy: IngestPolicy,
    ) -> Result<IngestOutcome, IngestError> {
        let drafts = self.ingestor.ingest(raw_text)?;
        let (chunk_texts, chunk_token_counts) = drafts
            .into_iter()
            .map(|draft| (draft.text, draft.token_count))
            .unzip();
        self.register_document(store, name, chunk_texts, chunk_token_counts, policy)
            .await
    }

    /// Score summaries against a question and pick the most relevant chunk.
    pub async fn select_relevant(
        &self,
        question: &str,
        summaries: &[(ChunkId, String)],
    ) -> Result<SelectionOutcome, SelectionError> {
        let outcome = self.selector.select(question, summaries).await?;
        if outcome.is_degraded() {
            self.metrics.record_fallback_selection();
        }
        Ok(outcome)
    }

    /// Answer a question from the supplied grounding text alone.
    pub async fn answer_question(
        &self,
        question: &str,
        grounding_text: &str,
    ) -> Result<String, GenerationClientError> {
        let answer = self.answerer.answer(question, grounding_text).await?;
        self.metrics.record_answer();
        Ok(answer)
    }

    /// Run the full question flow: select the most relevant chunk, fetch its
    /// text, generate the grounded answer.
    pub async fn ask(
        &self,
        store: &DocumentStore,
        question: &str,
    ) -> Result<AskOutcome, QuestionError> {
        let summaries = store.summaries();
        let selection = self.select_relevant(question, &summaries).await?;
        let chunk = store
            .chunk(selection.chosen())
            .ok_or_else(|| QuestionError::MissingChunk {
                id: selection.chosen().to_string(),
            })?;
        let answer = self.answer_question(question, &chunk.text).await?;
        tracing::info!(
            chosen = %chunk.id,
            degraded = selection.is_degraded(),
            "Question answered"
        );
        Ok(AskOutcome {
            chosen: chunk.id.clone(),
            degraded: selection.is_degraded(),
            scores: selection.scores().clone(),
            answer,
        })
    }

    /// Return the current pipeline metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl QaApi for QaService {
    fn count_tokens(&self, text: &str) -> usize {
        QaService::count_tokens(self, text)
    }

    fn split_text(&self, text: &str) -> Result<Vec<String>, ChunkingError> {
        QaService::split_text(self, text)
    }

    fn extract_document(&self, bytes: &[u8]) -> Result<(Vec<String>, Vec<usize>), IngestError> {
        QaService::extract_document(self, bytes)
    }

    async fn summarize_text(&self, text: &str) -> Result<String, GenerationClientError> {
        QaService::summarize_text(self, text).await
    }

    async fn register_document(
        &self,
        store: &mut DocumentStore,
        name: &str,
        chunk_texts: Vec<String>,
        chunk_token_counts: Vec<usize>,
        policy: IngestPolicy,
    ) -> Result<IngestOutcome, IngestError> {
        QaService::register_document(self, store, name, chunk_texts, chunk_token_counts, policy)
            .await
    }

    async fn select_relevant(
        &self,
        question: &str,
        summaries: &[(ChunkId, String)],
    ) -> Result<SelectionOutcome, SelectionError> {
        QaService::select_relevant(self, question, summaries).await
    }

    async fn answer_question(
        &self,
        question: &str,
        grounding_text: &str,
    ) -> Result<String, GenerationClientError> {
        QaService::answer_question(self, question, grounding_text).await
    }

    async fn ask(
        &self,
        store: &DocumentStore,
        question: &str,
    ) -> Result<AskOutcome, QuestionError> {
        QaService::ask(self, store, question).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        QaService::metrics_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AgentConfig, AgentsConfig, DocumentProcessingConfig, GenerationConfig,
    };
    use crate::generation::test_support::ScriptedClient;

    fn agent(system_prompt: &str) -> AgentConfig {
        AgentConfig {
            system_prompt: system_prompt.into(),
            model_prompt: String::new(),
            temperature: 0.0,
            max_tokens: 256,
        }
    }

    fn config(max_chunk_tokens: usize) -> Config {
        Config {
            generation: GenerationConfig {
                endpoint: "http://127.0.0.1:0".into(),
                api_key: None,
                model: "gpt-3.5-turbo".into(),
            },
            document_processing: DocumentProcessingConfig { max_chunk_tokens },
            agents: AgentsConfig {
                document_analysis: agent("summarize"),
                researcher: agent("score"),
                reply: agent("answer"),
            },
            server_port: None,
        }
    }

    fn service(max_chunk_tokens: usize, client: Arc<ScriptedClient>) -> QaService {
        QaService::with_client(&config(max_chunk_tokens), client).expect("service")
    }

    #[tokio::test]
    async fn registers_and_summarizes_every_chunk() {
        let client = Arc::new(ScriptedClient::replying(["first appendix", "second appendix"]));
        let service = service(100, client);
        let mut store = DocumentStore::new();

        let outcome = service
            .register_document(
                &mut store,
                "notes.pdf",
                vec!["part one".into(), "part two".into()],
                vec![2, 2],
                IngestPolicy::SkipExisting,
            )
            .await
            .expect("registered");

        assert_eq!(
            outcome.chunk_ids,
            vec!["notes.pdf (Part 1/2)", "notes.pdf (Part 2/2)"]
        );
        assert!(!outcome.skipped_existing);
        assert_eq!(
            store.summary("notes.pdf (Part 2/2)"),
            Some("second appendix")
        );
        assert_eq!(service.metrics_snapshot().documents_ingested, 1);
        assert_eq!(service.metrics_snapshot().chunks_ingested, 2);
    }

    #[tokio::test]
    async fn summarizer_failure_leaves_the_store_unchanged() {
        let client = Arc::new(ScriptedClient::new([
            Ok("first appendix".to_string()),
            Err(GenerationClientError::GenerationFailed("boom".into())),
        ]));
        let service = service(100, client);
        let mut store = DocumentStore::new();

        let error = service
            .register_document(
                &mut store,
                "notes.pdf",
                vec!["part one".into(), "part two".into()],
                vec![2, 2],
                IngestPolicy::SkipExisting,
            )
            .await
            .expect_err("failure");

        assert!(matches!(error, IngestError::Generation(_)));
        assert!(store.is_empty());
        assert_eq!(service.metrics_snapshot().documents_ingested, 0);
    }

    #[tokio::test]
    async fn skip_existing_short_circuits_before_summarizing() {
        let client = Arc::new(ScriptedClient::replying(["only appendix"]));
        let service = service(100, client.clone());
        let mut store = DocumentStore::new();

        service
            .ingest_document(&mut store, "a.pdf", "text", IngestPolicy::SkipExisting)
            .await
            .expect("first ingestion");
        let outcome = service
            .ingest_document(&mut store, "a.pdf", "other", IngestPolicy::SkipExisting)
            .await
            .expect("second ingestion");

        assert!(outcome.skipped_existing);
        assert_eq!(outcome.chunk_ids, vec!["a.pdf"]);
        assert_eq!(client.calls().len(), 1);
        assert_eq!(store.chunk("a.pdf").expect("chunk").text, "text");
    }

    #[tokio::test]
    async fn mismatched_counts_are_rejected() {
        let client = Arc::new(ScriptedClient::replying(Vec::<String>::new()));
        let service = service(100, client);
        let mut store = DocumentStore::new();

        let error = service
            .register_document(
                &mut store,
                "a.pdf",
                vec!["text".into()],
                vec![1, 2],
                IngestPolicy::SkipExisting,
            )
            .await
            .expect_err("mismatch");
        assert!(matches!(
            error,
            IngestError::CountMismatch {
                chunks: 1,
                counts: 2
            }
        ));
    }

    #[tokio::test]
    async fn ask_grounds_the_answer_in_the_chosen_chunk() {
        let client = Arc::new(ScriptedClient::replying([
            "Describes sky color.",
            r#"{"report.pdf": 99}"#,
            "Blue.",
        ]));
        let service = service(100, client.clone());
        let mut store = DocumentStore::new();
        service
            .ingest_document(
                &mut store,
                "report.pdf",
                "The sky is blue.",
                IngestPolicy::SkipExisting,
            )
            .await
            .expect("ingested");

        let outcome = service
            .ask(&store, "What color is the sky?")
            .await
            .expect("answered");

        assert_eq!(outcome.chosen, "report.pdf");
        assert_eq!(outcome.answer, "Blue.");
        assert!(!outcome.degraded);
        assert_eq!(outcome.scores.get("report.pdf"), Some(&99.0));

        let calls = client.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[2].user_prompt.contains("The sky is blue."));
        assert_eq!(service.metrics_snapshot().questions_answered, 1);
    }

    #[tokio::test]
    async fn ask_with_empty_store_reports_no_documents() {
        let client = Arc::new(ScriptedClient::replying(Vec::<String>::new()));
        let service = service(100, client);
        let store = DocumentStore::new();

        let error = service.ask(&store, "anything?").await.expect_err("error");
        assert!(matches!(
            error,
            QuestionError::Selection(SelectionError::NoDocumentsAvailable)
        ));
    }

    #[tokio::test]
    async fn degraded_selection_is_counted_and_still_answers() {
        let client = Arc::new(ScriptedClient::replying([
            "appendix",
            "not json at all",
            "I don't know.",
        ]));
        let service = service(100, client);
        let mut store = DocumentStore::new();
        service
            .ingest_document(&mut store, "a.pdf", "text", IngestPolicy::SkipExisting)
            .await
            .expect("ingested");

        let outcome = service.ask(&store, "question?").await.expect("answered");
        assert!(outcome.degraded);
        assert_eq!(outcome.chosen, "a.pdf");
        assert_eq!(outcome.scores.get("a.pdf"), Some(&0.0));
        assert_eq!(service.metrics_snapshot().fallback_selections, 1);
    }
}
