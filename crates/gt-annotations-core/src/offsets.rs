//! Span offset checks against document bounds.

use crate::error::{AnnotationError, Result};
use crate::manifest::EntityAnnotation;

/// Checks every span against a document of `document_len` bytes.
///
/// Spans are checked in extraction order and the first violation is
/// returned. A span must satisfy `begin <= end`, `0 <= begin < document_len`
/// and `end <= document_len`.
pub fn validate_offsets(
    annotations: &[EntityAnnotation],
    document_len: usize,
    manifest_file: &str,
) -> Result<()> {
    let len = i64::try_from(document_len).unwrap_or(i64::MAX);

    for annotation in annotations {
        let (begin, end) = (annotation.begin, annotation.end);
        if end < begin {
            return Err(AnnotationError::InvalidEndOffset {
                file: manifest_file.to_string(),
                line: annotation.line,
                begin,
                end,
            });
        }
        if begin < 0 || begin >= len || end > len {
            return Err(AnnotationError::OffsetOutOfRange {
                file: manifest_file.to_string(),
                line: annotation.line,
                begin,
                end,
                length: document_len,
            });
        }
    }

    Ok(())
}
