//! `s3://bucket/key` references and CSV output locations.

use crate::{StorageError, StorageResult};
use std::fmt;
use std::str::FromStr;

const SCHEME: &str = "s3://";

/// Bucket and key of an S3 object or prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct S3Uri {
    pub bucket: String,
    /// Object key without a leading slash; empty for the bucket root
    pub key: String,
}

impl S3Uri {
    pub fn parse(uri: &str) -> StorageResult<Self> {
        let rest = uri
            .strip_prefix(SCHEME)
            .ok_or_else(|| StorageError::InvalidUri(uri.to_string()))?;
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(StorageError::InvalidUri(uri.to_string()));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.trim_start_matches('/').to_string(),
        })
    }

    /// Last segment of the key (empty for the bucket root).
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or_default()
    }

    /// The key as a listing prefix, i.e. with a trailing `/`.
    #[must_use]
    pub fn folder_prefix(&self) -> String {
        if self.key.is_empty() || self.key.ends_with('/') {
            self.key.clone()
        } else {
            format!("{}/", self.key)
        }
    }

    /// URI of `key` in the same bucket.
    #[must_use]
    pub fn with_key(&self, key: &str) -> Self {
        Self {
            bucket: self.bucket.clone(),
            key: key.to_string(),
        }
    }
}

impl FromStr for S3Uri {
    type Err = StorageError;

    fn from_str(s: &str) -> StorageResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for S3Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}/{}", self.bucket, self.key)
    }
}

/// Validated destination for a converted CSV file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    uri: S3Uri,
}

impl OutputTarget {
    /// Accepts only `s3://bucket/.../name.csv`.
    pub fn parse(uri: &str) -> StorageResult<Self> {
        let invalid = || StorageError::InvalidOutputTarget(uri.to_string());
        let parsed = S3Uri::parse(uri).map_err(|_| invalid())?;

        let file_name = parsed.file_name();
        let has_stem = file_name
            .strip_suffix(".csv")
            .is_some_and(|stem| !stem.is_empty());
        if !has_stem {
            return Err(invalid());
        }

        Ok(Self { uri: parsed })
    }

    #[must_use]
    pub fn uri(&self) -> &S3Uri {
        &self.uri
    }

    /// File name used for the local copy of the output.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.uri.file_name()
    }
}

impl FromStr for OutputTarget {
    type Err = StorageError;

    fn from_str(s: &str) -> StorageResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.uri.fmt(f)
    }
}
