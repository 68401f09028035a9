//! Manifest-to-training-data converters.
//!
//! Each manifest line is converted independently. Batch conversion fans the
//! lines out with rayon and gathers the results back in line order, so the
//! reported failure is always the first failing line.

use crate::config::{ClassifierConverterConfig, EntityConverterConfig};
use crate::error::{AnnotationError, Result};
use crate::manifest::{EntityAnnotation, ManifestLineParser};
use crate::offsets::validate_offsets;
use crate::overlap::check_overlaps;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// One converted entity-recognition document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedDocument {
    pub source: String,
    /// Spans in ascending begin-offset order
    pub annotations: Vec<EntityAnnotation>,
}

/// One converted classification document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedDocument {
    /// Single label, or delimiter-joined labels in multi-label mode
    pub labels: String,
    pub source: String,
}

/// Converts every non-blank line of `content` in parallel.
///
/// Line indices are 0-based over all lines, blank ones included.
fn convert_lines<T, F>(content: &str, convert: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize, &str) -> Result<T> + Sync,
{
    let lines: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();

    let results: Vec<Result<T>> = lines
        .par_iter()
        .map(|&(index, line)| convert(index, line))
        .collect();

    results.into_iter().collect()
}

/// Ground-truth entity spans to dataset rows plus annotation rows.
#[derive(Debug, Clone)]
pub struct EntityRecognitionConverter {
    config: EntityConverterConfig,
    parser: ManifestLineParser,
}

impl EntityRecognitionConverter {
    #[must_use]
    pub fn new(config: EntityConverterConfig) -> Self {
        let parser = ManifestLineParser::new(config.manifest_file_name.clone(), config.limits);
        Self { config, parser }
    }

    #[must_use]
    pub fn config(&self) -> &EntityConverterConfig {
        &self.config
    }

    /// Parses, offset-checks and overlap-checks one manifest line.
    pub fn convert_line(&self, index: usize, line: &str) -> Result<ConvertedDocument> {
        let record = self.parser.parse_record(index, line)?;
        let mut annotations = self
            .parser
            .entity_annotations(&record, &self.config.dataset_file_name)?;

        let manifest_file = self.parser.manifest_file();
        validate_offsets(&annotations, record.document_len(), manifest_file)?;
        check_overlaps(&mut annotations, manifest_file)?;

        for annotation in &mut annotations {
            annotation.label = self.config.label_case.apply(&annotation.label);
        }

        debug!(line = index, spans = annotations.len(), "Converted manifest line");
        Ok(ConvertedDocument {
            source: record.source,
            annotations,
        })
    }

    /// Converts a whole manifest. Any failing line fails the batch.
    pub fn convert_manifest(&self, content: &str) -> Result<Vec<ConvertedDocument>> {
        let documents = convert_lines(content, |index, line| self.convert_line(index, line))?;
        info!(
            documents = documents.len(),
            spans = documents.iter().map(|d| d.annotations.len()).sum::<usize>(),
            "Converted entity recognition manifest"
        );
        Ok(documents)
    }
}

/// Classification mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassifierMode {
    MultiClass,
    MultiLabel,
}

impl ClassifierMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MultiClass => "MULTI_CLASS",
            Self::MultiLabel => "MULTI_LABEL",
        }
    }
}

impl fmt::Display for ClassifierMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassifierMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "MULTI_CLASS" => Ok(Self::MultiClass),
            "MULTI_LABEL" => Ok(Self::MultiLabel),
            other => Err(format!(
                "invalid mode {other:?}, valid values are MULTI_CLASS|MULTI_LABEL"
            )),
        }
    }
}

/// Ground-truth classification output to `label,"source"` rows.
#[derive(Debug, Clone)]
pub struct ClassifierConverter {
    parser: ManifestLineParser,
}

impl ClassifierConverter {
    #[must_use]
    pub fn new(config: ClassifierConverterConfig) -> Self {
        Self {
            parser: ManifestLineParser::new(config.manifest_file_name, config.limits),
        }
    }

    pub fn convert_multi_class(&self, index: usize, line: &str) -> Result<ClassifiedDocument> {
        let record = self.parser.parse_record(index, line)?;
        let labels = self.parser.class_name(&record)?;
        Ok(ClassifiedDocument {
            labels,
            source: record.source,
        })
    }

    pub fn convert_multi_label(
        &self,
        index: usize,
        line: &str,
        delimiter: &str,
    ) -> Result<ClassifiedDocument> {
        let record = self.parser.parse_record(index, line)?;
        let labels = self.parser.class_labels(&record, delimiter)?;
        Ok(ClassifiedDocument {
            labels,
            source: record.source,
        })
    }

    pub fn convert_line(
        &self,
        index: usize,
        line: &str,
        mode: ClassifierMode,
        delimiter: &str,
    ) -> Result<ClassifiedDocument> {
        match mode {
            ClassifierMode::MultiClass => self.convert_multi_class(index, line),
            ClassifierMode::MultiLabel => self.convert_multi_label(index, line, delimiter),
        }
    }

    /// Converts a whole manifest. Any failing line fails the batch.
    ///
    /// In multi-label mode an empty delimiter is rejected before any line is
    /// read.
    pub fn convert_manifest(
        &self,
        content: &str,
        mode: ClassifierMode,
        delimiter: &str,
    ) -> Result<Vec<ClassifiedDocument>> {
        if mode == ClassifierMode::MultiLabel && delimiter.is_empty() {
            return Err(AnnotationError::InvalidLabelDelimiter(delimiter.to_string()));
        }

        let documents = convert_lines(content, |index, line| {
            self.convert_line(index, line, mode, delimiter)
        })?;
        info!(mode = %mode, documents = documents.len(), "Converted classification manifest");
        Ok(documents)
    }
}
