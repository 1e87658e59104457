//! Answer synthesis: grounding prompt construction and model invocation.
//!
//! The synthesizer only ever sees already-filtered chunks. With nothing to
//! ground on it answers immediately with a fixed message and never calls
//! the model; otherwise it builds one prompt carrying every chunk with its
//! provenance and a strict set of answering rules, then invokes the
//! generative profile with bounded output and low temperature.

use std::fmt::Write;
use std::{future::Future, pin::Pin, sync::Arc};

use tracing::{debug, info};

use ai_llm_service::LlmServiceProfiles;

use crate::document::{AnswerResult, RetrievedChunk, SourceRef};
use crate::errors::RagError;

/// Fixed answer returned when retrieval produced no relevant context.
pub const NO_CONTEXT_ANSWER: &str = "I could not find content related to your question in the \
uploaded documents. Try a different question, or upload a document that covers this topic.";

/// Maximum characters in a source preview.
const PREVIEW_CHARS: usize = 200;

/// Text generation backend used by the synthesizer.
pub trait TextGenerator: Send + Sync {
    /// Generates an answer for a fully built prompt.
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, RagError>> + Send + 'a>>;

    /// Identifier of the underlying model, for result attribution.
    fn model_name(&self) -> String;
}

/// [`TextGenerator`] backed by the shared LLM service profiles.
pub struct ProfileGenerator {
    svc: Arc<LlmServiceProfiles>,
}

impl ProfileGenerator {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc }
    }
}

impl TextGenerator for ProfileGenerator {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, RagError>> + Send + 'a>> {
        Box::pin(async move {
            self.svc
                .generate(prompt, None)
                .await
                .map_err(|source| RagError::Llm {
                    op: "generate_answer",
                    source,
                })
        })
    }

    fn model_name(&self) -> String {
        self.svc.profiles().0.model.clone()
    }
}

/// Produces an answer with citations from retrieved context.
///
/// # Errors
/// Propagates generation failures; an empty `chunks` slice is not an error
/// (the fixed no-context answer comes back instead, without a model call).
pub async fn synthesize(
    generator: &dyn TextGenerator,
    question: &str,
    chunks: &[RetrievedChunk],
) -> Result<AnswerResult, RagError> {
    if chunks.is_empty() {
        debug!("no relevant context; skipping model call");
        return Ok(AnswerResult {
            answer: NO_CONTEXT_ANSWER.to_string(),
            sources: Vec::new(),
            has_answer: false,
            model_used: None,
            retrieval_stats: None,
        });
    }

    let prompt = build_answer_prompt(question, chunks);
    debug!(
        chunks = chunks.len(),
        prompt_chars = prompt.chars().count(),
        "invoking generative model"
    );

    let answer = generator.generate(&prompt).await?;
    info!(chunks = chunks.len(), "answer generated");

    Ok(AnswerResult {
        answer,
        sources: chunks.iter().map(source_ref).collect(),
        has_answer: true,
        model_used: Some(generator.model_name()),
        retrieval_stats: None,
    })
}

/// Builds the grounding prompt: one labeled block per chunk in rank order,
/// then the question and the answering rules.
fn build_answer_prompt(question: &str, chunks: &[RetrievedChunk]) -> String {
    let mut s = String::with_capacity(2048);

    writeln!(
        s,
        "You are a document-based question answering assistant. Analyze the document \
chunks provided below and answer the question."
    )
    .ok();

    writeln!(s, "\nRetrieved document chunks:").ok();
    for (i, chunk) in chunks.iter().enumerate() {
        writeln!(
            s,
            "\n[Chunk {}: {}, page {}, similarity {:.2}]\n{}",
            i + 1,
            chunk.metadata.document,
            chunk.metadata.page,
            chunk.similarity,
            chunk.content
        )
        .ok();
    }

    writeln!(s, "\nQuestion: {question}").ok();

    writeln!(s, "\nAnswering rules:").ok();
    writeln!(
        s,
        "1. Relevance: use only the chunks that actually relate to the question. A low \
similarity score does not disqualify a chunk that is semantically on-topic."
    )
    .ok();
    writeln!(
        s,
        "2. Ignore chunks unrelated to the question; never include them in the answer."
    )
    .ok();
    writeln!(
        s,
        "3. Synthesize: combine information from multiple chunks into one structured \
answer; number or categorize items when there are several."
    )
    .ok();
    writeln!(
        s,
        "4. Citations: always state the source (document name and page) for every claim, \
e.g. \"According to report.pdf (p.5), ...\"."
    )
    .ok();
    writeln!(
        s,
        "5. If the provided chunks contain no relevant information, say plainly that the \
documents do not cover it. Do not fabricate."
    )
    .ok();

    writeln!(s, "\nBegin your answer:").ok();

    s
}

/// Builds a citation entry with a bounded content preview.
fn source_ref(chunk: &RetrievedChunk) -> SourceRef {
    SourceRef {
        document: chunk.metadata.document.clone(),
        page: chunk.metadata.page,
        similarity: chunk.similarity,
        preview: preview(&chunk.content),
    }
}

/// First [`PREVIEW_CHARS`] characters of the content, with an ellipsis
/// when truncated. Character-based, safe for multi-byte text.
fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        return content.to_string();
    }
    let mut p: String = content.chars().take(PREVIEW_CHARS).collect();
    p.push_str("...");
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{RetrievedMetadata, SourceType};

    fn hit(document: &str, page: u32, similarity: f32, content: &str) -> RetrievedChunk {
        RetrievedChunk {
            content: content.to_string(),
            metadata: RetrievedMetadata {
                document: document.to_string(),
                page,
                chunk_index: 0,
                source_type: SourceType::Txt,
                chunk_id: format!("{document}_chunk_0"),
            },
            distance: 1.0 - similarity,
            similarity,
        }
    }

    /// Generator that must never be called.
    struct Unreachable;
    impl TextGenerator for Unreachable {
        fn generate<'a>(
            &'a self,
            _prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String, RagError>> + Send + 'a>> {
            panic!("model must not be invoked without context");
        }
        fn model_name(&self) -> String {
            "unreachable".into()
        }
    }

    /// Generator that records the prompt and answers with a canned string.
    struct Canned;
    impl TextGenerator for Canned {
        fn generate<'a>(
            &'a self,
            prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String, RagError>> + Send + 'a>> {
            let echo = format!("answer [{} chars seen]", prompt.chars().count());
            Box::pin(async move { Ok(echo) })
        }
        fn model_name(&self) -> String {
            "canned-model".into()
        }
    }

    #[tokio::test]
    async fn empty_context_short_circuits_without_model_call() {
        let result = synthesize(&Unreachable, "anything?", &[]).await.unwrap();
        assert!(!result.has_answer);
        assert_eq!(result.answer, NO_CONTEXT_ANSWER);
        assert!(result.sources.is_empty());
        assert!(result.model_used.is_none());
    }

    #[tokio::test]
    async fn answer_carries_sources_and_model() {
        let chunks = vec![
            hit("report.pdf", 5, 0.91, "grading criteria are listed here"),
            hit("notes.txt", 1, 0.72, "some other context"),
        ];
        let result = synthesize(&Canned, "how is grading done?", &chunks)
            .await
            .unwrap();
        assert!(result.has_answer);
        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.sources[0].document, "report.pdf");
        assert_eq!(result.sources[0].page, 5);
        assert_eq!(result.model_used.as_deref(), Some("canned-model"));
    }

    #[test]
    fn prompt_contains_labels_question_and_rules() {
        let chunks = vec![hit("report.pdf", 5, 0.91, "grading criteria")];
        let prompt = build_answer_prompt("how is grading done?", &chunks);
        assert!(prompt.contains("[Chunk 1: report.pdf, page 5, similarity 0.91]"));
        assert!(prompt.contains("grading criteria"));
        assert!(prompt.contains("Question: how is grading done?"));
        assert!(prompt.contains("Do not fabricate"));
        assert!(prompt.contains("document name and page"));
    }

    #[test]
    fn chunks_appear_in_rank_order() {
        let chunks = vec![
            hit("first.txt", 1, 0.9, "first content"),
            hit("second.txt", 2, 0.8, "second content"),
        ];
        let prompt = build_answer_prompt("q", &chunks);
        let a = prompt.find("first content").unwrap();
        let b = prompt.find("second content").unwrap();
        assert!(a < b);
    }

    #[test]
    fn preview_is_bounded_to_200_chars() {
        let long = "x".repeat(500);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 203); // 200 + "..."
        assert!(p.ends_with("..."));

        let short = "short content";
        assert_eq!(preview(short), short);
    }
}
