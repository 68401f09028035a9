//! Overlap detection between spans of one document.

use crate::error::{AnnotationError, Result};
use crate::manifest::EntityAnnotation;

/// Sorts `annotations` by begin offset and rejects overlapping neighbours.
///
/// The sort is stable, so spans sharing a begin offset keep their extraction
/// order. Spans are half-open: one ending where the next begins is allowed.
/// Offsets are assumed to be range-checked already.
pub fn check_overlaps(annotations: &mut [EntityAnnotation], manifest_file: &str) -> Result<()> {
    annotations.sort_by_key(|annotation| annotation.begin);

    for pair in annotations.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        if previous.end > current.begin {
            return Err(AnnotationError::OverlappingAnnotations {
                file: manifest_file.to_string(),
                line: current.line,
                first: previous.label.clone(),
                second: current.label.clone(),
            });
        }
    }

    Ok(())
}
