//! Storage layer for annotation manifests and annotation files
//!
//! Manifests, annotation files and source documents live either in an
//! S3-compatible object store or on the local filesystem. Both are reached
//! through the [`ObjectSource`] trait, addressed by a full reference: an
//! `s3://bucket/key` URI for [`S3ObjectSource`], a path for
//! [`LocalFileSource`].
//!
//! # Example
//!
//! ```rust,no_run
//! use gt_annotations_storage::{ObjectSource, S3Config, S3ObjectSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = S3ObjectSource::new(S3Config::default()).await;
//!
//!     let manifest = source
//!         .get_object_content("s3://labeling-bucket/job/manifests/output/output.manifest")
//!         .await?;
//!     for annotation in source.list_objects("s3://labeling-bucket/job/annotations/").await? {
//!         println!("{annotation}");
//!     }
//!     # let _ = manifest;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

pub mod object_source;
pub mod uri;

pub use object_source::{LocalFileSource, ObjectSource, S3Config, S3ObjectSource};
pub use uri::{OutputTarget, S3Uri};

/// Storage layer errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("S3 error: {0}")]
    S3Error(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid S3 URI: {0}")]
    InvalidUri(String),

    #[error("Invalid output location {0}: expected s3://bucket/path/name.csv")]
    InvalidOutputTarget(String),

    #[error("Object {0} is not valid UTF-8")]
    InvalidUtf8(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = StorageError::NotFound("s3://bucket/a.json".to_string());
        assert_eq!(error.to_string(), "Object not found: s3://bucket/a.json");

        let error = StorageError::InvalidOutputTarget("s3://bucket/out.txt".to_string());
        assert!(error.to_string().contains("name.csv"));
    }
}
