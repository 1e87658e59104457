//! Core data models used by the library.
//!
//! A [`Document`] is one extracted page/section of an uploaded file; the
//! chunker turns documents into [`Chunk`]s, which are the atomic unit of
//! storage and retrieval. Everything the pipeline returns to callers
//! (retrieval hits, answers, reports) also lives here.

use serde::{Deserialize, Serialize};

/// File format a document was extracted from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Pdf,
    Docx,
    Txt,
}

impl SourceType {
    /// Lowercase wire/name form (`"pdf"`, `"docx"`, `"txt"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Pdf => "pdf",
            SourceType::Docx => "docx",
            SourceType::Txt => "txt",
        }
    }

    /// Parses the lowercase form back; unknown values map to `Txt`.
    pub fn parse(s: &str) -> SourceType {
        match s {
            "pdf" => SourceType::Pdf,
            "docx" => SourceType::Docx,
            _ => SourceType::Txt,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of one extracted document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Display name of the uploaded file (unique within the corpus).
    pub document: String,
    /// Page number this text came from (1-based).
    pub page: u32,
    /// Total pages in the source file.
    pub total_pages: u32,
    /// Source file format.
    pub source_type: SourceType,
}

/// One page/section of extracted plain text, ready for chunking.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Metadata attached to every chunk.
///
/// `chunk_id` is the sole stable identity of a chunk and the vector-store
/// key; it must never collide across documents within the active corpus.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub document: String,
    pub page: u32,
    pub source_type: SourceType,
    /// `"<document>_chunk_<global_sequence>"`, unique per ingestion call.
    pub chunk_id: String,
    /// Position of this chunk within its source document (0-based).
    pub chunk_index: usize,
    /// Number of chunks produced from the same source document.
    pub total_chunks: usize,
    /// Chunk content length in characters.
    pub chunk_size: usize,
}

/// The atomic retrieval unit: a bounded slice of document text.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Provenance of a retrieved chunk, decoded from the stored payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrievedMetadata {
    pub document: String,
    pub page: u32,
    pub chunk_index: usize,
    pub source_type: SourceType,
    pub chunk_id: String,
}

/// One similarity-search hit. Ephemeral, produced per query.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub metadata: RetrievedMetadata,
    /// Dissimilarity in `[0, 1]` for cosine space.
    pub distance: f32,
    /// `1 - distance`.
    pub similarity: f32,
}

/// Key + metadata of one stored vector, as returned by full enumeration.
#[derive(Clone, Debug)]
pub struct ListedVector {
    /// The logical key (chunk_id).
    pub key: String,
    pub document: String,
    pub page: Option<u32>,
    pub source_type: String,
}

/// Aggregated view of one stored document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document: String,
    pub source_type: String,
    pub chunk_count: usize,
    pub page_count: usize,
    /// Distinct pages, ascending.
    pub pages: Vec<u32>,
}

/// Citation entry attached to an answer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceRef {
    pub document: String,
    pub page: u32,
    pub similarity: f32,
    /// Content preview, at most 200 characters.
    pub preview: String,
}

/// Retrieval statistics surfaced alongside an answer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrievalStats {
    pub total_retrieved: usize,
    pub total_relevant: usize,
    pub similarity_threshold: f32,
}

/// Outcome of context retrieval for one question.
#[derive(Clone, Debug)]
pub struct RetrievalOutcome {
    /// Hits above the similarity threshold, in rank order.
    pub chunks: Vec<RetrievedChunk>,
    pub total_retrieved: usize,
    pub total_relevant: usize,
    pub has_relevant_context: bool,
}

/// Final answer with citations and retrieval statistics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub has_answer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_stats: Option<RetrievalStats>,
}

/// Per-stage counts for one ingestion run.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct IngestReport {
    /// Pages/sections extracted from the file.
    pub pages: usize,
    /// Chunks produced by the splitter.
    pub chunks: usize,
    /// Chunks successfully embedded.
    pub embedded: usize,
    /// Chunks whose embedding failed (excluded from storage).
    pub failed: usize,
    /// Vectors written to the index.
    pub stored: usize,
    /// Upsert batches submitted.
    pub batches: usize,
}

/// Outcome of a bulk vector write.
#[derive(Clone, Copy, Debug)]
pub struct PutOutcome {
    pub total_stored: usize,
    pub batches: usize,
}

/// Outcome of a bulk deletion.
#[derive(Clone, Copy, Debug)]
pub struct DeleteOutcome {
    pub deleted_count: usize,
}

/// Terminal state of an index lifecycle operation. "Not found" is a valid
/// outcome, distinct from "deleted", and never an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexLifecycle {
    Deleted,
    NotFound,
}
