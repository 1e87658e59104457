//! Document Q&A core: ingestion, retrieval, and grounded answering over
//! Qdrant.
//!
//! This crate provides a clean API to:
//! - Ingest documents: extract text, split into overlapping chunks, embed,
//!   and store vectors with provenance metadata
//! - Answer questions: retrieve the most similar chunks, filter them by a
//!   similarity threshold, and synthesize a cited answer with an LLM
//! - Administer the index: list documents, delete by document, wipe
//!   vectors, drop the collection
//!
//! The design is flat (no deep nesting) and splits responsibilities into
//! focused modules behind the single [`RagPipeline`] facade.

mod answer;
mod chunker;
mod config;
mod document;
mod embed;
mod errors;
mod extract;
mod ingest;
mod qdrant_facade;
mod reporter;
mod retrieve;

pub use answer::{NO_CONTEXT_ANSWER, ProfileGenerator, TextGenerator, synthesize};
pub use chunker::split_documents;
pub use config::{DistanceKind, RagConfig};
pub use document::{
    AnswerResult, Chunk, ChunkMetadata, DeleteOutcome, Document, DocumentMetadata,
    DocumentSummary, IndexLifecycle, IngestReport, ListedVector, PutOutcome, RetrievalOutcome,
    RetrievalStats, RetrievedChunk, RetrievedMetadata, SourceRef, SourceType,
};
pub use embed::{EmbeddingClient, EmbeddingsProvider, ProfileEmbedder, RateLimiter};
pub use errors::RagError;
pub use extract::{DefaultExtractor, TextExtractor};
pub use qdrant_facade::{IndexStatus, QdrantFacade};
pub use reporter::{Reporter, TracingReporter};
pub use retrieve::retrieve_context;

use std::sync::Arc;

use tracing::trace;

use ai_llm_service::LlmServiceProfiles;

/// High-level facade wiring configuration, the vector store, the embedding
/// client, and the generative profile.
///
/// This is the single entry point recommended for application code.
pub struct RagPipeline {
    cfg: RagConfig,
    facade: QdrantFacade,
    embedder: EmbeddingClient,
    generator: ProfileGenerator,
    extractor: Box<dyn TextExtractor>,
    reporter: Arc<dyn Reporter>,
}

impl RagPipeline {
    /// Constructs a pipeline from configuration and the shared LLM service.
    ///
    /// Uses the built-in [`DefaultExtractor`] and [`TracingReporter`];
    /// see [`RagPipeline::with_extractor`] / [`RagPipeline::with_reporter`]
    /// to swap them.
    ///
    /// # Errors
    /// Returns [`RagError::Config`] / [`RagError::Qdrant`] if the
    /// configuration is invalid or the client cannot be built.
    pub fn new(cfg: RagConfig, svc: Arc<LlmServiceProfiles>) -> Result<Self, RagError> {
        trace!(collection = %cfg.collection, "RagPipeline::new");
        let facade = QdrantFacade::new(&cfg)?;
        let embedder = EmbeddingClient::new(Arc::new(ProfileEmbedder::new(svc.clone())), &cfg);
        let generator = ProfileGenerator::new(svc);

        Ok(Self {
            cfg,
            facade,
            embedder,
            generator,
            extractor: Box::new(DefaultExtractor),
            reporter: Arc::new(TracingReporter),
        })
    }

    /// Replaces the text extractor (e.g., to add DOCX support).
    pub fn with_extractor(mut self, extractor: Box<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replaces the reporter used for non-fatal notices.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Read access to the active configuration.
    pub fn config(&self) -> &RagConfig {
        &self.cfg
    }

    /// Ensures the backing collection exists (idempotent).
    ///
    /// # Errors
    /// Returns [`RagError::Qdrant`] on backend failures.
    pub async fn ensure_index(&self) -> Result<(), RagError> {
        self.facade
            .ensure_index(self.cfg.embedding_dim, self.reporter.as_ref())
            .await
    }

    /// Ingests one uploaded file: extract → chunk → embed → store.
    ///
    /// # Errors
    /// See [`ingest::ingest_document`].
    pub async fn ingest(&self, bytes: &[u8], filename: &str) -> Result<IngestReport, RagError> {
        ingest::ingest_document(
            &self.cfg,
            self.extractor.as_ref(),
            &self.embedder,
            &self.facade,
            bytes,
            filename,
            self.reporter.as_ref(),
        )
        .await
    }

    /// Full question-answering flow: retrieve context, synthesize an
    /// answer, and attach retrieval statistics.
    ///
    /// # Errors
    /// Propagates embedding, query, and generation failures.
    pub async fn ask(
        &self,
        question: &str,
        top_k: Option<u64>,
    ) -> Result<AnswerResult, RagError> {
        let context =
            retrieve::retrieve_context(&self.cfg, &self.embedder, &self.facade, question, top_k)
                .await?;

        let mut result = answer::synthesize(&self.generator, question, &context.chunks).await?;
        result.retrieval_stats = Some(RetrievalStats {
            total_retrieved: context.total_retrieved,
            total_relevant: context.total_relevant,
            similarity_threshold: self.cfg.similarity_threshold,
        });

        Ok(result)
    }

    /// Lists stored documents with chunk and page statistics.
    ///
    /// # Errors
    /// Returns [`RagError::Qdrant`] on backend failures.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>, RagError> {
        self.facade.list_documents().await
    }

    /// Deletes all vectors belonging to `document`.
    ///
    /// # Errors
    /// Returns [`RagError::Qdrant`] on backend failures.
    pub async fn delete_document(&self, document: &str) -> Result<DeleteOutcome, RagError> {
        self.facade
            .delete_by_document(document, self.reporter.as_ref())
            .await
    }

    /// Deletes every vector in the index.
    ///
    /// # Errors
    /// Returns [`RagError::Qdrant`] on backend failures.
    pub async fn delete_all(&self) -> Result<DeleteOutcome, RagError> {
        self.facade.delete_all(self.reporter.as_ref()).await
    }

    /// Drops the backing collection; absent is a valid outcome.
    ///
    /// # Errors
    /// Returns [`RagError::Qdrant`] on unexpected backend failures.
    pub async fn delete_index(&self) -> Result<IndexLifecycle, RagError> {
        self.facade.delete_index().await
    }
}
