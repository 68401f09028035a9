//! Semantic validation path: schema check, then entity text reconciliation.

use crate::error::{AnnotationError, Result};
use crate::reconcile::reconcile_document;
use crate::schema::parse_annotation;
use crate::stats::ValidationStats;
use tracing::error;

/// Validates one annotation file and records the outcome under `name`.
///
/// A schema failure marks the file format-invalid. Without
/// `fail_on_invalid` the failure is only recorded and `Ok(())` is returned;
/// with it, the schema or first reconciliation error is returned.
pub fn validate_annotation(
    content: &str,
    name: &str,
    stats: &mut ValidationStats,
    fail_on_invalid: bool,
) -> Result<()> {
    let file_stats = stats.file_mut(name);

    let document = match parse_annotation(content, name) {
        Ok(document) => document,
        Err(e @ AnnotationError::SchemaViolation { .. }) => {
            error!(file = %name, error = %e, "Failed to validate annotation schema");
            file_stats.invalid_format = true;
            return if fail_on_invalid { Err(e) } else { Ok(()) };
        }
        Err(e) => return Err(e),
    };

    reconcile_document(&document, name, file_stats, fail_on_invalid)
}
