//! Context retrieval: embed the question, search, filter by similarity.

use tracing::{debug, trace};

use crate::config::RagConfig;
use crate::document::{RetrievalOutcome, RetrievedChunk};
use crate::embed::EmbeddingClient;
use crate::errors::RagError;
use crate::qdrant_facade::QdrantFacade;

/// Retrieves grounding context for a question.
///
/// Embeds the question, queries `top_k` nearest neighbors (config default
/// when `None`), and keeps hits whose similarity clears the configured
/// threshold, preserving rank order. Empty retrieval is a valid outcome,
/// not an error.
///
/// # Errors
/// Propagates embedding failures and backend failures from the query.
pub async fn retrieve_context(
    cfg: &RagConfig,
    embedder: &EmbeddingClient,
    facade: &QdrantFacade,
    question: &str,
    top_k: Option<u64>,
) -> Result<RetrievalOutcome, RagError> {
    let top_k = top_k.unwrap_or(cfg.top_k);
    trace!(top_k, "retrieve_context: embedding question");

    let question_vector = embedder.embed_one(question).await?;
    debug!(dim = question_vector.len(), "question embedded");

    let results = facade.query(question_vector, top_k, None).await?;
    let total_retrieved = results.len();

    let chunks = filter_by_threshold(results, cfg.similarity_threshold);
    let total_relevant = chunks.len();

    debug!(
        total_retrieved,
        total_relevant,
        threshold = cfg.similarity_threshold,
        "retrieval filtered"
    );

    Ok(RetrievalOutcome {
        has_relevant_context: total_relevant > 0,
        chunks,
        total_retrieved,
        total_relevant,
    })
}

/// Keeps hits with `similarity >= threshold`, in their original order.
fn filter_by_threshold(results: Vec<RetrievedChunk>, threshold: f32) -> Vec<RetrievedChunk> {
    results
        .into_iter()
        .filter(|r| r.similarity >= threshold)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{RetrievedMetadata, SourceType};

    fn hit(id: &str, similarity: f32) -> RetrievedChunk {
        RetrievedChunk {
            content: format!("content {id}"),
            metadata: RetrievedMetadata {
                document: "doc.txt".into(),
                page: 1,
                chunk_index: 0,
                source_type: SourceType::Txt,
                chunk_id: id.to_string(),
            },
            distance: 1.0 - similarity,
            similarity,
        }
    }

    #[test]
    fn filtering_preserves_rank_order() {
        let results = vec![hit("a", 0.95), hit("b", 0.4), hit("c", 0.8), hit("d", 0.7)];
        let kept = filter_by_threshold(results, 0.7);
        let ids: Vec<&str> = kept.iter().map(|c| c.metadata.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
    }

    #[test]
    fn raising_the_threshold_never_admits_more() {
        let results = vec![hit("a", 0.95), hit("b", 0.75), hit("c", 0.7), hit("d", 0.2)];
        let mut last = usize::MAX;
        for threshold in [0.0, 0.3, 0.7, 0.75, 0.9, 1.0] {
            let kept = filter_by_threshold(results.clone(), threshold).len();
            assert!(kept <= last, "threshold {threshold} admitted more hits");
            last = kept;
        }
    }

    #[test]
    fn empty_input_filters_to_empty() {
        assert!(filter_by_threshold(Vec::new(), 0.7).is_empty());
    }

    #[test]
    fn threshold_is_inclusive() {
        let kept = filter_by_threshold(vec![hit("a", 0.7)], 0.7);
        assert_eq!(kept.len(), 1);
    }
}
