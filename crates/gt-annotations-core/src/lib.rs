//! Validation and conversion of ground-truth annotation manifests.
//!
//! Two pipelines share this crate:
//!
//! - **Conversion**: manifest lines go through [`ManifestLineParser`], the
//!   offset check and the overlap check, producing dataset and annotation CSV
//!   rows ([`EntityRecognitionConverter`], [`ClassifierConverter`]).
//! - **Validation**: annotation files go through the schema check and
//!   [`EntityTextReconciler`], with outcomes counted in [`ValidationStats`].
//!
//! Everything here is synchronous and free of I/O beyond `std::io::Write`
//! sinks; fetching manifests and annotation files is the caller's job.

pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod geometry;
pub mod manifest;
pub mod model;
pub mod offsets;
pub mod overlap;
pub mod reconcile;
pub mod schema;
pub mod stats;
pub mod validate;

pub use config::{ClassifierConverterConfig, ConversionLimits, EntityConverterConfig, LabelCase};
pub use convert::{
    ClassifiedDocument, ClassifierConverter, ClassifierMode, ConvertedDocument,
    EntityRecognitionConverter,
};
pub use error::{AnnotationError, Result};
pub use export::{write_annotations_csv, write_classifier_csv, write_dataset_csv};
pub use geometry::{aggregate_block_reference, BoundingBox, Geometry, Point};
pub use manifest::{
    basename, locate_job_key, AnnotationManifestEntry, EntityAnnotation, JobKeyLookup, JobKind,
    ManifestLineParser, ManifestRecord,
};
pub use model::{
    slice_chars, AnnotationDocument, Block, BlockIndex, BlockReference, BlockType,
    ChildBlockReference, Entity, Relationship,
};
pub use offsets::validate_offsets;
pub use overlap::check_overlaps;
pub use reconcile::{reconcile_document, EntityTextReconciler, EntityVerdict, ReferencedText};
pub use schema::{parse_annotation, validate_schema, SchemaViolation};
pub use stats::{DatasetSummary, EntityCounts, FileStats, ValidationStats};
pub use validate::validate_annotation;
