//! HTTP surface for Doc QA.
//!
//! This module exposes a compact Axum router with one endpoint per pipeline
//! operation:
//!
//! - `POST /count_tokens` – Token count for a text.
//! - `POST /split_text` – Token-bounded chunking of a text.
//! - `POST /extract_text` – Extract a PDF (raw request body) into chunk
//!   texts and token counts.
//! - `POST /summarize` – Appendix for one chunk of text.
//! - `POST /documents` – Summarize and register a pre-chunked document.
//! - `GET /documents` – List registered chunks with summaries and counts.
//! - `POST /select_relevant` – Score supplied summaries against a question.
//! - `POST /answer` – Answer a question from supplied grounding text.
//! - `POST /ask` – Full flow against the session's document store.
//! - `GET /metrics` – Observe pipeline counters.
//!
//! The handlers hold no pipeline logic; they translate JSON bodies into
//! [`QaApi`] calls and error kinds into status codes. The session's
//! [`DocumentStore`] lives in the shared state behind a `RwLock`: questions
//! take read guards and may run concurrently, ingestion takes the write
//! guard and is thereby serialized.

use crate::metrics::MetricsSnapshot;
use crate::pipeline::{
    ChunkingError, DocumentStore, IngestError, IngestPolicy, QaApi, QuestionError, RelevanceScores,
    SelectionError, SelectionOutcome,
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared state handed to every handler: the pipeline service plus the
/// session-scoped document store.
pub struct AppState<S> {
    service: Arc<S>,
    store: Arc<RwLock<DocumentStore>>,
}

impl<S> AppState<S> {
    /// Build state around a service, starting from an empty store.
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            store: Arc::new(RwLock::new(DocumentStore::new())),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            store: self.store.clone(),
        }
    }
}

/// Build the HTTP router exposing the pipeline API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: QaApi + 'static,
{
    Router::new()
        .route("/count_tokens", post(count_tokens::<S>))
        .route("/split_text", post(split_text::<S>))
        .route("/extract_text", post(extract_text::<S>))
        .route("/summarize", post(summarize::<S>))
        .route(
            "/documents",
            get(list_documents::<S>).post(register_document::<S>),
        )
        .route("/select_relevant", post(select_relevant::<S>))
        .route("/answer", post(answer::<S>))
        .route("/ask", post(ask::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(AppState::new(service))
}

/// Request body carrying a single text field.
#[derive(Deserialize)]
struct TextRequest {
    text: String,
}

#[derive(Serialize)]
struct CountTokensResponse {
    token_count: usize,
}

async fn count_tokens<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<TextRequest>,
) -> Json<CountTokensResponse>
where
    S: QaApi,
{
    Json(CountTokensResponse {
        token_count: state.service.count_tokens(&request.text),
    })
}

#[derive(Serialize)]
struct SplitTextResponse {
    chunks: Vec<String>,
}

async fn split_text<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<TextRequest>,
) -> Result<Json<SplitTextResponse>, AppError>
where
    S: QaApi,
{
    let chunks = state.service.split_text(&request.text)?;
    Ok(Json(SplitTextResponse { chunks }))
}

#[derive(Serialize)]
struct ExtractTextResponse {
    chunks: Vec<String>,
    chunk_tokens: Vec<usize>,
}

/// Extract a PDF supplied as the raw request body.
async fn extract_text<S>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Result<Json<ExtractTextResponse>, AppError>
where
    S: QaApi,
{
    let (chunks, chunk_tokens) = state.service.extract_document(&body)?;
    Ok(Json(ExtractTextResponse {
        chunks,
        chunk_tokens,
    }))
}

#[derive(Serialize)]
struct SummarizeResponse {
    summary: String,
}

async fn summarize<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<TextRequest>,
) -> Result<Json<SummarizeResponse>, AppError>
where
    S: QaApi,
{
    let summary = state.service.summarize_text(&request.text).await?;
    Ok(Json(SummarizeResponse { summary }))
}

/// Request body for `POST /documents`.
#[derive(Deserialize)]
struct RegisterDocumentRequest {
    /// Display name of the uploaded document.
    file_name: String,
    /// Chunk texts in document order.
    chunks: Vec<String>,
    /// Token counts parallel to `chunks`.
    chunk_tokens: Vec<usize>,
    /// Replace an already-registered document instead of skipping it.
    #[serde(default)]
    reprocess: bool,
}

#[derive(Serialize)]
struct RegisterDocumentResponse {
    chunk_ids: Vec<String>,
    chunk_count: usize,
    skipped_existing: bool,
}

async fn register_document<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<RegisterDocumentRequest>,
) -> Result<Json<RegisterDocumentResponse>, AppError>
where
    S: QaApi,
{
    let policy = if request.reprocess {
        IngestPolicy::Reprocess
    } else {
        IngestPolicy::SkipExisting
    };
    // Write guard serializes ingestion; ChunkId assignment never races.
    let mut store = state.store.write().await;
    let outcome = state
        .service
        .register_document(
            &mut store,
            &request.file_name,
            request.chunks,
            request.chunk_tokens,
            policy,
        )
        .await?;
    Ok(Json(RegisterDocumentResponse {
        chunk_ids: outcome.chunk_ids,
        chunk_count: outcome.chunk_count,
        skipped_existing: outcome.skipped_existing,
    }))
}

#[derive(Serialize)]
struct DocumentEntry {
    id: String,
    token_count: usize,
    summary: String,
}

#[derive(Serialize)]
struct ListDocumentsResponse {
    documents: Vec<DocumentEntry>,
}

async fn list_documents<S>(State(state): State<AppState<S>>) -> Json<ListDocumentsResponse>
where
    S: QaApi,
{
    let store = state.store.read().await;
    let documents = store
        .entries()
        .map(|(chunk, summary)| DocumentEntry {
            id: chunk.id.clone(),
            token_count: chunk.token_count,
            summary: summary.to_string(),
        })
        .collect();
    Json(ListDocumentsResponse { documents })
}

/// Request body for `POST /select_relevant`.
///
/// Summaries arrive as a JSON object; entries are handed to the selector in
/// the object's (deterministic) key order, which therefore also defines the
/// fallback choice and tie-break for this endpoint.
#[derive(Deserialize)]
struct SelectRelevantRequest {
    question: String,
    summaries: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct SelectRelevantResponse {
    most_relevant: String,
    relevance_scores: RelevanceScores,
    degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

async fn select_relevant<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<SelectRelevantRequest>,
) -> Result<Json<SelectRelevantResponse>, AppError>
where
    S: QaApi,
{
    let summaries: Vec<(String, String)> = request.summaries.into_iter().collect();
    let outcome = state
        .service
        .select_relevant(&request.question, &summaries)
        .await?;
    Ok(Json(selection_response(outcome)))
}

fn selection_response(outcome: SelectionOutcome) -> SelectRelevantResponse {
    match outcome {
        SelectionOutcome::Ranked { chosen, scores } => SelectRelevantResponse {
            most_relevant: chosen,
            relevance_scores: scores,
            degraded: false,
            reason: None,
        },
        SelectionOutcome::Fallback {
            chosen,
            scores,
            reason,
        } => SelectRelevantResponse {
            most_relevant: chosen,
            relevance_scores: scores,
            degraded: true,
            reason: Some(reason),
        },
    }
}

/// Request body for `POST /answer`.
#[derive(Deserialize)]
struct AnswerRequest {
    question: String,
    document_text: String,
}

#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
}

async fn answer<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError>
where
    S: QaApi,
{
    let answer = state
        .service
        .answer_question(&request.question, &request.document_text)
        .await?;
    Ok(Json(AnswerResponse { answer }))
}

/// Request body for `POST /ask`.
#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    most_relevant: String,
    relevance_scores: RelevanceScores,
    degraded: bool,
    answer: String,
}

async fn ask<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError>
where
    S: QaApi,
{
    let store = state.store.read().await;
    let outcome = state.service.ask(&store, &request.question).await?;
    Ok(Json(AskResponse {
        most_relevant: outcome.chosen,
        relevance_scores: outcome.scores,
        degraded: outcome.degraded,
        answer: outcome.answer,
    }))
}

async fn get_metrics<S>(State(state): State<AppState<S>>) -> Json<MetricsSnapshot>
where
    S: QaApi,
{
    Json(state.service.metrics_snapshot())
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, message: impl ToString) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<ChunkingError> for AppError {
    fn from(error: ChunkingError) -> Self {
        match error {
            ChunkingError::InvalidChunkSize => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, error)
            }
            ChunkingError::Tokenizer(_) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, error),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(error: IngestError) -> Self {
        match error {
            IngestError::Extraction(_) | IngestError::Generation(_) => {
                Self::new(StatusCode::BAD_GATEWAY, error)
            }
            IngestError::Chunking(inner) => inner.into(),
            IngestError::CountMismatch { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, error)
            }
        }
    }
}

impl From<crate::generation::GenerationClientError> for AppError {
    fn from(error: crate::generation::GenerationClientError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, error)
    }
}

impl From<SelectionError> for AppError {
    fn from(error: SelectionError) -> Self {
        match error {
            SelectionError::NoDocumentsAvailable => Self::new(StatusCode::CONFLICT, error),
            SelectionError::Generation(_) => Self::new(StatusCode::BAD_GATEWAY, error),
        }
    }
}

impl From<QuestionError> for AppError {
    fn from(error: QuestionError) -> Self {
        match error {
            QuestionError::Selection(inner) => inner.into(),
            QuestionError::Generation(_) => Self::new(StatusCode::BAD_GATEWAY, error),
            QuestionError::MissingChunk { .. } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
            }
        }
    }
}
