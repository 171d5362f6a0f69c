//! Text extraction from binary documents.
//!
//! The pipeline only ever consumes the extracted string; layout, images and
//! rendering concerns stay inside the `pdf-extract` crate. Page texts are
//! concatenated in order, matching how uploads are read elsewhere.

use thiserror::Error;

/// Errors raised while pulling text out of a binary document.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The PDF could not be parsed or carried no extractable text layer.
    #[error("failed to extract text from PDF: {source}")]
    Pdf {
        /// Underlying extraction error.
        #[source]
        source: pdf_extract::OutputError,
    },
}

/// Extract the full text of a PDF supplied as raw bytes.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|source| ExtractionError::Pdf { source })?;
    tracing::debug!(bytes = bytes.len(), chars = text.len(), "Extracted PDF text");
    Ok(text)
}
