//! Error types for annotation validation and conversion.
//!
//! Every variant carries the structured parameters of the failure (line,
//! file, offsets, limits, labels) so callers can render or inspect them
//! without parsing message text.

use crate::schema::SchemaViolation;
use thiserror::Error;

/// Errors raised while parsing, validating or converting annotations.
///
/// Parsing, offset, overlap and size errors are fatal for the record that
/// produced them. Schema and reconciliation errors are only returned when the
/// caller asked for fail-fast semantics; otherwise they are recorded in
/// [`ValidationStats`](crate::stats::ValidationStats).
#[derive(Error, Debug)]
pub enum AnnotationError {
    /// The manifest record could not be decoded into the expected shape.
    #[error("Unable to parse line {line} in the file {file}: {reason}")]
    ManifestParse {
        line: usize,
        file: String,
        reason: String,
    },

    /// More than one top-level key qualifies as the labeling job.
    #[error("Line {line} in the file {file} has more than one labeling job key: {}", .keys.join(", "))]
    AmbiguousJobKey {
        line: usize,
        file: String,
        keys: Vec<String>,
    },

    /// The document's UTF-8 encoding is longer than the configured ceiling.
    #[error("A document exceeds the maximum size in the file {file} on line {line}: {size} bytes (max: {limit} bytes)")]
    DocumentTooLarge {
        line: usize,
        file: String,
        size: usize,
        limit: usize,
    },

    /// A classification record carries no label at all.
    #[error("Labels cannot be empty. The file {file} contains an empty label on line {line}")]
    EmptyLabel { line: usize, file: String },

    /// A joined multi-label string contains an empty segment.
    #[error("Empty label found on line {line} of the file {file}. Check for a leading, trailing or repeated label delimiter")]
    EmptyLabelInList { line: usize, file: String },

    /// A label is longer than the configured character ceiling.
    #[error("The label on line {line} of the file {file} has {length} characters (max: {limit})")]
    LabelTooLong {
        line: usize,
        file: String,
        length: usize,
        limit: usize,
    },

    /// The multi-label delimiter cannot split anything.
    #[error("Invalid label delimiter: {0:?}")]
    InvalidLabelDelimiter(String),

    /// A span ends before it begins.
    #[error("An incorrect annotation is located in the file {file} on line {line}. The offset begins at position {begin} and ends at position {end}. End offset cannot be less than begin offset")]
    InvalidEndOffset {
        file: String,
        line: usize,
        begin: i64,
        end: i64,
    },

    /// A span lies outside the document.
    #[error("An offset exceeds the maximum length in the file {file} on line {line}. The offset begins at position {begin} and ends at position {end}. An offset can be up to {length}")]
    OffsetOutOfRange {
        file: String,
        line: usize,
        begin: i64,
        end: i64,
        length: usize,
    },

    /// Two spans of the same document overlap.
    #[error("Overlapping annotations are located in the file {file} on line {line}. The annotations are: {first} and {second}")]
    OverlappingAnnotations {
        file: String,
        line: usize,
        first: String,
        second: String,
    },

    /// The annotation document does not match the block/entity schema.
    #[error("Annotation {file} failed schema validation: {}", render_violations(.violations))]
    SchemaViolation {
        file: String,
        violations: Vec<SchemaViolation>,
    },

    /// The entity text differs from the text of the blocks it references.
    #[error("Entity of type {entity_type} in {file} does not match its blocks: expected {expected:?}, line blocks gave {line_text:?}, word blocks gave {word_text:?}")]
    TextMismatch {
        file: String,
        entity_type: String,
        expected: String,
        line_text: String,
        word_text: String,
    },

    /// A block reference does not resolve within its document.
    #[error("Block not found: {block_id}")]
    MissingBlock { block_id: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn render_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for annotation operations
pub type Result<T> = std::result::Result<T, AnnotationError>;
