//! End-to-end ingestion: extract → chunk → embed → store.
//!
//! Each stage reports its counts; partial embedding failures reduce the
//! stored set but never abort the run. The run is strictly sequential —
//! the only pacing comes from the embedding client's rate limiter.

use tracing::{info, warn};

use crate::chunker::split_documents;
use crate::config::RagConfig;
use crate::document::IngestReport;
use crate::embed::EmbeddingClient;
use crate::errors::RagError;
use crate::extract::TextExtractor;
use crate::qdrant_facade::QdrantFacade;
use crate::reporter::Reporter;

/// Ingests one uploaded file into the vector index.
///
/// Re-ingesting a document without deleting its prior vectors first is not
/// guarded against: unchanged content overwrites in place (ids are
/// deterministic), but a changed split can leave orphaned tail chunks.
/// Delete by document before re-ingesting when idempotency matters.
///
/// # Errors
/// - [`RagError::UnsupportedFormat`] / [`RagError::Extract`] from extraction
/// - [`RagError::Validation`] when nothing could be embedded
/// - [`RagError::Qdrant`] on storage failures
pub async fn ingest_document(
    cfg: &RagConfig,
    extractor: &dyn TextExtractor,
    embedder: &EmbeddingClient,
    facade: &QdrantFacade,
    bytes: &[u8],
    filename: &str,
    reporter: &dyn Reporter,
) -> Result<IngestReport, RagError> {
    info!(file = filename, size = bytes.len(), "ingestion started");

    let documents = extractor.extract(bytes, filename)?;
    reporter.info(&format!(
        "extracted {} page(s)/section(s) from {filename}",
        documents.len()
    ));

    let chunks = split_documents(&documents, cfg.chunk_size, cfg.chunk_overlap)?;
    reporter.info(&format!("split into {} chunk(s)", chunks.len()));

    if chunks.is_empty() {
        warn!(file = filename, "no chunkable text found");
        return Ok(IngestReport {
            pages: documents.len(),
            ..IngestReport::default()
        });
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let embeddings = embedder.embed_batch(&texts, reporter).await;
    let embedded = embeddings.iter().filter(|e| e.is_some()).count();
    let failed = embeddings.len() - embedded;
    reporter.info(&format!("embedded {embedded} chunk(s)"));

    let outcome = facade
        .put_vectors(&chunks, &embeddings, cfg.embedding_dim, reporter)
        .await?;
    reporter.info(&format!(
        "stored {} vector(s) in {} batch(es)",
        outcome.total_stored, outcome.batches
    ));

    info!(
        file = filename,
        pages = documents.len(),
        chunks = chunks.len(),
        embedded,
        failed,
        stored = outcome.total_stored,
        "ingestion finished"
    );

    Ok(IngestReport {
        pages: documents.len(),
        chunks: chunks.len(),
        embedded,
        failed,
        stored: outcome.total_stored,
        batches: outcome.batches,
    })
}
