//! Unified error types for the crate.
//!
//! Every backend failure is wrapped with the name of the failing operation
//! so that surfaced messages always read "what failed: why". Empty results
//! (no chunks, no relevant context, nothing to delete) are represented in
//! the result types, never as errors.

use thiserror::Error;

/// Top-level error for rag-store operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid or incomplete configuration (missing keys are enumerated).
    #[error("config error: {0}")]
    Config(String),

    /// Invalid input to an operation (mismatched lengths, zero valid items,
    /// out-of-range parameters). Fatal to the call, never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// The document's extension maps to no known extractor.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Text extraction itself failed (corrupt file, bad encoding).
    #[error("text extraction failed: {0}")]
    Extract(String),

    /// Mismatch in vector dimensionality.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// Qdrant client errors, wrapped with the failing operation.
    #[error("{op} failed: {message}")]
    Qdrant {
        /// Operation name (e.g., `put_vectors`, `list_all`).
        op: &'static str,
        /// Underlying client error text.
        message: String,
    },

    /// Embedding/generation backend errors, wrapped with the failing
    /// operation. Transient failures were already retried downstream.
    #[error("{op} failed: {source}")]
    Llm {
        /// Operation name (e.g., `embed_query`, `generate_answer`).
        op: &'static str,
        /// Underlying service error.
        #[source]
        source: ai_llm_service::AiLlmError,
    },
}

impl RagError {
    /// Wraps a Qdrant client error with its operation name.
    pub(crate) fn qdrant(op: &'static str, err: impl std::fmt::Display) -> Self {
        RagError::Qdrant {
            op,
            message: err.to_string(),
        }
    }
}
