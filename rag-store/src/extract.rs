//! Text extraction: file bytes in, plain-text [`Document`]s out.
//!
//! Extraction is a collaborator of the pipeline, not part of it: the
//! pipeline only relies on the [`TextExtractor`] contract. The default
//! implementation covers `.txt` (UTF-8) and `.pdf` (via `pdf-extract`,
//! whole-file text). DOCX input needs a caller-provided extractor.

use tracing::debug;

use crate::document::{Document, DocumentMetadata, SourceType};
use crate::errors::RagError;

/// Turns raw file bytes into extracted documents.
///
/// Paginated formats should yield one [`Document`] per page; everything
/// else yields a single whole-file document.
pub trait TextExtractor: Send + Sync {
    /// Extracts plain text from `bytes`.
    ///
    /// # Errors
    /// - [`RagError::UnsupportedFormat`] for unrecognized extensions
    /// - [`RagError::Extract`] when the file cannot be decoded
    fn extract(&self, bytes: &[u8], filename: &str) -> Result<Vec<Document>, RagError>;
}

/// Built-in extractor for txt and pdf input.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultExtractor;

impl TextExtractor for DefaultExtractor {
    fn extract(&self, bytes: &[u8], filename: &str) -> Result<Vec<Document>, RagError> {
        match extension_of(filename) {
            Some("txt") => extract_txt(bytes, filename),
            Some("pdf") => extract_pdf(bytes, filename),
            Some("docx") | Some("doc") => Err(RagError::UnsupportedFormat(format!(
                "{filename}: docx extraction requires a custom TextExtractor"
            ))),
            _ => Err(RagError::UnsupportedFormat(format!(
                "{filename}: expected .txt or .pdf"
            ))),
        }
    }
}

/// Lowercased extension of a filename, if any.
fn extension_of(filename: &str) -> Option<&str> {
    let (_, ext) = filename.rsplit_once('.')?;
    match ext {
        e if e.eq_ignore_ascii_case("txt") => Some("txt"),
        e if e.eq_ignore_ascii_case("pdf") => Some("pdf"),
        e if e.eq_ignore_ascii_case("docx") => Some("docx"),
        e if e.eq_ignore_ascii_case("doc") => Some("doc"),
        _ => None,
    }
}

/// Whole-file UTF-8 text, one document.
fn extract_txt(bytes: &[u8], filename: &str) -> Result<Vec<Document>, RagError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| RagError::Extract(format!("{filename}: invalid UTF-8: {e}")))?
        .to_string();

    debug!(file = filename, chars = text.chars().count(), "extracted txt");

    Ok(vec![Document {
        text,
        metadata: DocumentMetadata {
            document: filename.to_string(),
            page: 1,
            total_pages: 1,
            source_type: SourceType::Txt,
        },
    }])
}

/// Whole-file PDF text, one document. Page-accurate splitting is left to
/// dedicated extractors; this keeps the default dependency-light.
fn extract_pdf(bytes: &[u8], filename: &str) -> Result<Vec<Document>, RagError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| RagError::Extract(format!("{filename}: {e}")))?;

    if text.trim().is_empty() {
        return Err(RagError::Extract(format!(
            "{filename}: no extractable text"
        )));
    }

    debug!(file = filename, chars = text.chars().count(), "extracted pdf");

    Ok(vec![Document {
        text,
        metadata: DocumentMetadata {
            document: filename.to_string(),
            page: 1,
            total_pages: 1,
            source_type: SourceType::Pdf,
        },
    }])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txt_roundtrip() {
        let docs = DefaultExtractor
            .extract("hello world".as_bytes(), "notes.txt")
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "hello world");
        assert_eq!(docs[0].metadata.document, "notes.txt");
        assert_eq!(docs[0].metadata.page, 1);
        assert_eq!(docs[0].metadata.source_type, SourceType::Txt);
    }

    #[test]
    fn uppercase_extension_accepted() {
        let docs = DefaultExtractor
            .extract("x".as_bytes(), "NOTES.TXT")
            .unwrap();
        assert_eq!(docs[0].metadata.source_type, SourceType::Txt);
    }

    #[test]
    fn unknown_extension_rejected() {
        let err = DefaultExtractor
            .extract(b"zzz", "slides.pptx")
            .unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_extension_rejected() {
        assert!(matches!(
            DefaultExtractor.extract(b"zzz", "README").unwrap_err(),
            RagError::UnsupportedFormat(_)
        ));
    }

    #[test]
    fn invalid_utf8_is_an_extract_error() {
        let err = DefaultExtractor
            .extract(&[0xff, 0xfe, 0x00], "broken.txt")
            .unwrap_err();
        assert!(matches!(err, RagError::Extract(_)));
    }
}
