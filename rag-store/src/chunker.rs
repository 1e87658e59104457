//! Layered-separator text chunking with overlap.
//!
//! Splitting prefers natural boundaries: paragraph breaks first, then line
//! breaks, then spaces, and only falls back to raw characters when no
//! separator yields a small-enough piece. Pieces are merged back into
//! windows of at most `chunk_size` characters, with consecutive windows of
//! the same document sharing up to `chunk_overlap` trailing characters.
//!
//! All lengths are measured in characters (Unicode scalar values), never
//! bytes, so multi-byte scripts chunk the same way as ASCII.

use tracing::{debug, warn};

use crate::document::{Chunk, ChunkMetadata, Document};
use crate::errors::RagError;

/// Separator priority: paragraph, line, word, raw characters.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splits documents into overlapping chunks with enriched metadata.
///
/// `chunk_index` numbers chunks from 0 within each source document;
/// `chunk_id` is assigned from one strictly increasing counter shared
/// across all documents in the call, so ids never collide within a single
/// ingestion batch. Empty or whitespace-only chunks are never emitted.
///
/// Pure transform: no I/O, no side effects.
///
/// # Errors
/// Returns [`RagError::Validation`] if `chunk_size == 0` or
/// `chunk_overlap >= chunk_size`.
pub fn split_documents(
    documents: &[Document],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>, RagError> {
    if chunk_size == 0 {
        return Err(RagError::Validation("chunk_size must be > 0".into()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::Validation(format!(
            "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }

    let mut all_chunks = Vec::new();
    let mut global_sequence = 0usize;

    for doc in documents {
        let pieces = split_text(&doc.text, &SEPARATORS, chunk_size, chunk_overlap);
        let total_chunks = pieces.len();

        debug!(
            document = %doc.metadata.document,
            page = doc.metadata.page,
            chunks = total_chunks,
            "document split"
        );

        for (chunk_index, content) in pieces.into_iter().enumerate() {
            let chunk_size_chars = char_len(&content);
            all_chunks.push(Chunk {
                metadata: ChunkMetadata {
                    document: doc.metadata.document.clone(),
                    page: doc.metadata.page,
                    source_type: doc.metadata.source_type,
                    chunk_id: format!("{}_chunk_{}", doc.metadata.document, global_sequence),
                    chunk_index,
                    total_chunks,
                    chunk_size: chunk_size_chars,
                },
                content,
            });
            global_sequence += 1;
        }
    }

    Ok(all_chunks)
}

/// Recursively splits `text`, trying separators in priority order.
fn split_text(
    text: &str,
    separators: &[&str],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<String> {
    // Pick the first separator present in the text; the final "" always
    // matches and leaves no further separators to recurse into.
    let mut separator = *separators.last().unwrap_or(&"");
    let mut remaining: &[&str] = &[];
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            separator = sep;
            break;
        }
        if text.contains(sep) {
            separator = sep;
            remaining = &separators[i + 1..];
            break;
        }
    }

    let splits = split_keeping_separator(text, separator);

    let mut final_chunks = Vec::new();
    let mut good: Vec<String> = Vec::new();

    for piece in splits {
        if char_len(&piece) < chunk_size {
            good.push(piece);
        } else {
            if !good.is_empty() {
                final_chunks.extend(merge_splits(&good, chunk_size, chunk_overlap));
                good.clear();
            }
            if remaining.is_empty() {
                // Atomic token with no finer separator; emitted as-is even
                // though it exceeds chunk_size.
                final_chunks.push(piece);
            } else {
                final_chunks.extend(split_text(&piece, remaining, chunk_size, chunk_overlap));
            }
        }
    }

    if !good.is_empty() {
        final_chunks.extend(merge_splits(&good, chunk_size, chunk_overlap));
    }

    final_chunks
}

/// Splits `text` by `separator`, keeping the separator attached to the
/// start of the following piece so no characters are lost. The empty
/// separator splits into individual characters.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(|c| c.to_string()).collect();
    }

    let mut out = Vec::new();
    for (i, part) in text.split(separator).enumerate() {
        if i == 0 {
            if !part.is_empty() {
                out.push(part.to_string());
            }
        } else {
            let mut piece = String::with_capacity(separator.len() + part.len());
            piece.push_str(separator);
            piece.push_str(part);
            out.push(piece);
        }
    }
    out
}

/// Merges small splits into windows of at most `chunk_size` characters,
/// carrying up to `chunk_overlap` trailing characters into the next window.
fn merge_splits(splits: &[String], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut docs: Vec<String> = Vec::new();
    let mut window: std::collections::VecDeque<&String> = std::collections::VecDeque::new();
    let mut total = 0usize;

    for piece in splits {
        let len = char_len(piece);

        if total + len > chunk_size {
            if total > chunk_size {
                warn!(
                    size = total,
                    chunk_size, "created a chunk longer than the requested size"
                );
            }
            if !window.is_empty() {
                if let Some(doc) = join_window(&window) {
                    docs.push(doc);
                }
                // Shrink from the front until the retained tail fits the
                // overlap budget and leaves room for the incoming piece.
                while total > chunk_overlap || (total + len > chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
        }

        window.push_back(piece);
        total += len;
    }

    if let Some(doc) = join_window(&window) {
        docs.push(doc);
    }

    docs
}

/// Concatenates the window and trims surrounding whitespace; `None` when
/// nothing printable remains.
fn join_window(window: &std::collections::VecDeque<&String>) -> Option<String> {
    let joined: String = window.iter().map(|s| s.as_str()).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentMetadata, SourceType};

    fn doc(name: &str, page: u32, text: &str) -> Document {
        Document {
            text: text.to_string(),
            metadata: DocumentMetadata {
                document: name.to_string(),
                page,
                total_pages: 1,
                source_type: SourceType::Txt,
            },
        }
    }

    #[test]
    fn character_windows_share_exactly_the_overlap() {
        let chunks = split_documents(&[doc("a.txt", 1, "abcdefghij")], 4, 2).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "cdef", "efgh", "ghij"]);
        for pair in texts.windows(2) {
            let prev_tail: String = pair[0].chars().skip(pair[0].len() - 2).collect();
            let next_head: String = pair[1].chars().take(2).collect();
            assert_eq!(prev_tail, next_head);
        }
    }

    #[test]
    fn zero_overlap_means_no_shared_characters() {
        let chunks = split_documents(&[doc("a.txt", 1, "abcdefghij")], 4, 0).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn word_boundaries_preferred_over_character_cuts() {
        let chunks =
            split_documents(&[doc("a.txt", 1, "the quick brown fox jumps")], 10, 3).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, vec!["the quick", "brown fox", "jumps"]);
        for c in &chunks {
            assert!(c.metadata.chunk_size <= 10);
        }
    }

    #[test]
    fn paragraph_boundaries_preserved() {
        let chunks =
            split_documents(&[doc("a.txt", 1, "para one.\n\npara two.")], 12, 0).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, vec!["para one.", "para two."]);
    }

    #[test]
    fn coverage_no_text_lost_without_overlap() {
        let original = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = split_documents(&[doc("a.txt", 1, original)], 12, 0).unwrap();
        let rebuilt = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn whitespace_only_input_produces_no_chunks() {
        let chunks = split_documents(&[doc("a.txt", 1, "   \n\n  \n ")], 500, 50).unwrap();
        assert!(chunks.is_empty());
        for c in &chunks {
            assert!(!c.content.trim().is_empty());
        }
    }

    #[test]
    fn small_document_yields_one_chunk() {
        let chunks = split_documents(&[doc("a.txt", 1, "short text")], 500, 50).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "short text");
        assert_eq!(chunks[0].metadata.chunk_id, "a.txt_chunk_0");
        assert_eq!(chunks[0].metadata.total_chunks, 1);
    }

    #[test]
    fn chunk_ids_are_global_but_indexes_restart_per_document() {
        let chunks = split_documents(
            &[doc("a.txt", 1, "abcdefgh"), doc("b.txt", 1, "ijklmnop")],
            4,
            0,
        )
        .unwrap();
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].metadata.chunk_id, "a.txt_chunk_0");
        assert_eq!(chunks[1].metadata.chunk_id, "a.txt_chunk_1");
        assert_eq!(chunks[2].metadata.chunk_id, "b.txt_chunk_2");
        assert_eq!(chunks[3].metadata.chunk_id, "b.txt_chunk_3");
        assert_eq!(chunks[2].metadata.chunk_index, 0);
        assert_eq!(chunks[3].metadata.chunk_index, 1);
    }

    #[test]
    fn lengths_are_characters_not_bytes() {
        // Four 3-byte characters; byte-based splitting would cut mid-char.
        let chunks = split_documents(&[doc("a.txt", 1, "가나다라")], 2, 0).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, vec!["가나", "다라"]);
    }

    #[test]
    fn invalid_parameters_rejected() {
        let d = [doc("a.txt", 1, "text")];
        assert!(matches!(
            split_documents(&d, 0, 0),
            Err(RagError::Validation(_))
        ));
        assert!(matches!(
            split_documents(&d, 10, 10),
            Err(RagError::Validation(_))
        ));
    }

    #[test]
    fn three_paragraph_page_with_default_settings() {
        let text = "First paragraph with some introduction text.\n\n\
                    Second paragraph holds the answer to the question.\n\n\
                    Third paragraph wraps things up.";
        let chunks = split_documents(&[doc("report.txt", 1, text)], 500, 50).unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks.iter().any(|c| c.content.contains("the answer")));
        for c in &chunks {
            assert!(c.metadata.chunk_size <= 500);
            assert_eq!(c.metadata.page, 1);
        }
    }
}
