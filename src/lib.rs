#![deny(missing_docs)]

//! Core library for the Doc QA server.

/// HTTP routing and REST handlers.
pub mod api;
/// Configuration document and environment loading.
pub mod config;
/// Text extraction from binary documents.
pub mod extraction;
/// Text-generation client abstraction and adapters.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Question-answering pipeline: chunking, summarization, selection, answers.
pub mod pipeline;
/// Byte-pair-encoding tokenizer wrapper.
pub mod tokenizer;
