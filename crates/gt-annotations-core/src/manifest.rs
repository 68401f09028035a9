//! Manifest record decoding.
//!
//! A manifest is newline-delimited JSON. Each conversion record carries the
//! document under `source` and the labeling job output under one dynamically
//! named key. Validation manifests instead point at a source document and an
//! annotation file through `source-ref` / `annotation-ref`.

use crate::config::ConversionLimits;
use crate::error::{AnnotationError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

pub const SOURCE: &str = "source";
pub const ANNOTATIONS: &str = "annotations";
pub const ENTITIES: &str = "entities";
pub const START_OFFSET: &str = "startOffset";
pub const END_OFFSET: &str = "endOffset";
pub const LABEL: &str = "label";
pub const CLASS_NAME: &str = "class-name";
pub const CLASS_MAP: &str = "class-map";
pub const METADATA_MARKER: &str = "-metadata";
pub const SOURCE_REF: &str = "source-ref";
pub const ANNOTATION_REF: &str = "annotation-ref";

/// Which labeling job payload a record is expected to carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Object-valued key whose value has an `annotations` member
    EntityRecognition,
    /// Object-valued key whose name contains `-metadata`
    Classification,
}

impl JobKind {
    fn matches(self, key: &str, value: &Value) -> bool {
        let Some(object) = value.as_object() else {
            return false;
        };
        match self {
            Self::EntityRecognition => object.contains_key(ANNOTATIONS),
            Self::Classification => key.contains(METADATA_MARKER),
        }
    }
}

/// Result of scanning a record for its labeling job key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKeyLookup<'a> {
    Found(&'a str),
    NotFound,
    Ambiguous(Vec<&'a str>),
}

/// Scans the record's entries once and classifies the job key candidates.
#[must_use]
pub fn locate_job_key(record: &Map<String, Value>, kind: JobKind) -> JobKeyLookup<'_> {
    let candidates: Vec<&str> = record
        .iter()
        .filter(|(key, value)| kind.matches(key, value))
        .map(|(key, _)| key.as_str())
        .collect();

    match candidates.len() {
        0 => JobKeyLookup::NotFound,
        1 => JobKeyLookup::Found(candidates[0]),
        _ => JobKeyLookup::Ambiguous(candidates),
    }
}

/// One decoded conversion record whose document passed the size check
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestRecord {
    /// 0-based line index in the manifest
    pub index: usize,
    pub source: String,
    fields: Map<String, Value>,
}

impl ManifestRecord {
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// UTF-8 length of the document, the bound for entity offsets
    #[must_use]
    pub fn document_len(&self) -> usize {
        self.source.len()
    }
}

/// Entity span extracted from a record: `(file, line, begin, end, label)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAnnotation {
    pub file: String,
    pub line: usize,
    pub begin: i64,
    pub end: i64,
    pub label: String,
}

/// Decodes manifest lines and extracts labeling job payloads.
#[derive(Debug, Clone)]
pub struct ManifestLineParser {
    manifest_file: String,
    limits: ConversionLimits,
}

impl ManifestLineParser {
    pub fn new(manifest_file: impl Into<String>, limits: ConversionLimits) -> Self {
        Self {
            manifest_file: manifest_file.into(),
            limits,
        }
    }

    #[must_use]
    pub fn manifest_file(&self) -> &str {
        &self.manifest_file
    }

    #[must_use]
    pub const fn limits(&self) -> ConversionLimits {
        self.limits
    }

    fn parse_error(&self, line: usize, reason: impl Into<String>) -> AnnotationError {
        AnnotationError::ManifestParse {
            line,
            file: self.manifest_file.clone(),
            reason: reason.into(),
        }
    }

    /// Decodes one line, requires `source` and enforces the document size.
    pub fn parse_record(&self, index: usize, line: &str) -> Result<ManifestRecord> {
        let value: Value = serde_json::from_str(line)
            .map_err(|e| self.parse_error(index, format!("invalid JSON: {e}")))?;
        let Value::Object(fields) = value else {
            return Err(self.parse_error(index, "record is not a JSON object"));
        };

        let source = match fields.get(SOURCE) {
            Some(Value::String(source)) => source.clone(),
            Some(_) => return Err(self.parse_error(index, "`source` is not a string")),
            None => return Err(self.parse_error(index, "missing `source` field")),
        };

        if source.len() > self.limits.max_document_bytes {
            return Err(AnnotationError::DocumentTooLarge {
                line: index,
                file: self.manifest_file.clone(),
                size: source.len(),
                limit: self.limits.max_document_bytes,
            });
        }

        Ok(ManifestRecord {
            index,
            source,
            fields,
        })
    }

    /// The object stored under the record's single job key.
    pub fn job_payload<'r>(
        &self,
        record: &'r ManifestRecord,
        kind: JobKind,
    ) -> Result<&'r Map<String, Value>> {
        match locate_job_key(&record.fields, kind) {
            JobKeyLookup::Found(key) => record.fields[key]
                .as_object()
                .ok_or_else(|| self.parse_error(record.index, "labeling job is not an object")),
            JobKeyLookup::NotFound => {
                Err(self.parse_error(record.index, "no labeling job key found"))
            }
            JobKeyLookup::Ambiguous(keys) => Err(AnnotationError::AmbiguousJobKey {
                line: record.index,
                file: self.manifest_file.clone(),
                keys: keys.into_iter().map(str::to_string).collect(),
            }),
        }
    }

    /// Extracts `annotations.entities` in record order.
    ///
    /// Offsets are not range-checked here.
    pub fn entity_annotations(
        &self,
        record: &ManifestRecord,
        dataset_file: &str,
    ) -> Result<Vec<EntityAnnotation>> {
        let index = record.index;
        let payload = self.job_payload(record, JobKind::EntityRecognition)?;
        let entities = payload
            .get(ANNOTATIONS)
            .and_then(Value::as_object)
            .and_then(|annotations| annotations.get(ENTITIES))
            .and_then(Value::as_array)
            .ok_or_else(|| self.parse_error(index, "missing `annotations.entities` list"))?;

        entities
            .iter()
            .enumerate()
            .map(|(i, entity)| {
                let begin = offset_value(entity.get(START_OFFSET)).ok_or_else(|| {
                    self.parse_error(index, format!("entity {i} has no integer `{START_OFFSET}`"))
                })?;
                let end = offset_value(entity.get(END_OFFSET)).ok_or_else(|| {
                    self.parse_error(index, format!("entity {i} has no integer `{END_OFFSET}`"))
                })?;
                let label = entity.get(LABEL).and_then(Value::as_str).ok_or_else(|| {
                    self.parse_error(index, format!("entity {i} has no string `{LABEL}`"))
                })?;

                Ok(EntityAnnotation {
                    file: dataset_file.to_string(),
                    line: index,
                    begin,
                    end,
                    label: label.to_string(),
                })
            })
            .collect()
    }

    fn check_label(&self, index: usize, label: &str) -> Result<()> {
        let length = label.chars().count();
        if length > self.limits.max_label_chars {
            return Err(AnnotationError::LabelTooLong {
                line: index,
                file: self.manifest_file.clone(),
                length,
                limit: self.limits.max_label_chars,
            });
        }
        Ok(())
    }

    /// Multi-class label from `class-name`.
    pub fn class_name(&self, record: &ManifestRecord) -> Result<String> {
        let index = record.index;
        let payload = self.job_payload(record, JobKind::Classification)?;
        let class_name = match payload.get(CLASS_NAME) {
            Some(Value::String(name)) => name,
            Some(_) => return Err(self.parse_error(index, "`class-name` is not a string")),
            None => return Err(self.parse_error(index, "missing `class-name`")),
        };

        if class_name.is_empty() {
            return Err(AnnotationError::EmptyLabel {
                line: index,
                file: self.manifest_file.clone(),
            });
        }
        self.check_label(index, class_name)?;
        Ok(class_name.clone())
    }

    /// Multi-label labels from `class-map`, joined with `delimiter`.
    ///
    /// The joined string is split again so that labels which are empty or
    /// contain the delimiter at their edges are rejected.
    pub fn class_labels(&self, record: &ManifestRecord, delimiter: &str) -> Result<String> {
        if delimiter.is_empty() {
            return Err(AnnotationError::InvalidLabelDelimiter(delimiter.to_string()));
        }

        let index = record.index;
        let payload = self.job_payload(record, JobKind::Classification)?;
        let class_map = match payload.get(CLASS_MAP) {
            Some(Value::Object(map)) => map,
            Some(_) => return Err(self.parse_error(index, "`class-map` is not an object")),
            None => return Err(self.parse_error(index, "missing `class-map`")),
        };

        if class_map.is_empty() {
            return Err(AnnotationError::EmptyLabel {
                line: index,
                file: self.manifest_file.clone(),
            });
        }

        let mut labels = Vec::with_capacity(class_map.len());
        for (key, value) in class_map {
            let label = value.as_str().ok_or_else(|| {
                self.parse_error(index, format!("`class-map` entry {key:?} is not a string"))
            })?;
            self.check_label(index, label)?;
            labels.push(label);
        }

        let joined = labels.join(delimiter);
        if joined.split(delimiter).any(str::is_empty) {
            return Err(AnnotationError::EmptyLabelInList {
                line: index,
                file: self.manifest_file.clone(),
            });
        }
        Ok(joined)
    }
}

/// Reads an offset from a JSON integer, a float (truncated) or an integer string.
fn offset_value(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Last path segment of a URI or file path.
#[must_use]
pub fn basename(reference: &str) -> &str {
    let trimmed = reference.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// One line of an annotation-validation manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationManifestEntry {
    pub source_ref: String,
    pub annotation_ref: String,
}

impl AnnotationManifestEntry {
    /// Reads `source-ref` and the first object-valued key carrying a
    /// non-empty `annotation-ref`.
    pub fn parse(index: usize, line: &str, manifest_file: &str) -> Result<Self> {
        let parse_error = |reason: String| AnnotationError::ManifestParse {
            line: index,
            file: manifest_file.to_string(),
            reason,
        };

        let value: Value =
            serde_json::from_str(line).map_err(|e| parse_error(format!("invalid JSON: {e}")))?;
        let Value::Object(fields) = value else {
            return Err(parse_error("record is not a JSON object".to_string()));
        };

        let annotation_ref = fields
            .values()
            .filter_map(Value::as_object)
            .filter_map(|job| job.get(ANNOTATION_REF).and_then(Value::as_str))
            .find(|reference| !reference.is_empty())
            .ok_or_else(|| parse_error(format!("no `{ANNOTATION_REF}` found")))?;
        let source_ref = fields
            .get(SOURCE_REF)
            .and_then(Value::as_str)
            .filter(|reference| !reference.is_empty())
            .ok_or_else(|| parse_error(format!("no `{SOURCE_REF}` found")))?;

        Ok(Self {
            source_ref: source_ref.to_string(),
            annotation_ref: annotation_ref.to_string(),
        })
    }

    /// Rewrites both references to `<dir>/<basename>` on the local filesystem.
    #[must_use]
    pub fn localize(&self, documents_dir: &Path, annotations_dir: &Path) -> Self {
        Self {
            source_ref: documents_dir
                .join(basename(&self.source_ref))
                .to_string_lossy()
                .into_owned(),
            annotation_ref: annotations_dir
                .join(basename(&self.annotation_ref))
                .to_string_lossy()
                .into_owned(),
        }
    }

    /// Name under which the annotation file's stats are recorded.
    #[must_use]
    pub fn annotation_name(&self) -> &str {
        basename(&self.annotation_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity_parser() -> ManifestLineParser {
        ManifestLineParser::new("output.manifest", ConversionLimits::entity_recognition())
    }

    fn classifier_parser() -> ManifestLineParser {
        ManifestLineParser::new("output.manifest", ConversionLimits::classification())
    }

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_locate_entity_job_key() {
        let record = fields(json!({
            "source": "Hello",
            "job-metadata": {"type": "groundtruth/text-span"},
            "job": {"annotations": {"entities": []}}
        }));
        assert_eq!(
            locate_job_key(&record, JobKind::EntityRecognition),
            JobKeyLookup::Found("job")
        );
        assert_eq!(
            locate_job_key(&record, JobKind::Classification),
            JobKeyLookup::Found("job-metadata")
        );
    }

    #[test]
    fn test_locate_job_key_ignores_non_objects() {
        let record = fields(json!({"source": "annotations", "job-metadata": "x"}));
        assert_eq!(
            locate_job_key(&record, JobKind::EntityRecognition),
            JobKeyLookup::NotFound
        );
        assert_eq!(
            locate_job_key(&record, JobKind::Classification),
            JobKeyLookup::NotFound
        );
    }

    #[test]
    fn test_locate_job_key_ambiguous() {
        let record = fields(json!({
            "a": {"annotations": {}},
            "b": {"annotations": {}}
        }));
        assert_eq!(
            locate_job_key(&record, JobKind::EntityRecognition),
            JobKeyLookup::Ambiguous(vec!["a", "b"])
        );
    }

    #[test]
    fn test_parse_record_requires_source() {
        let err = entity_parser().parse_record(4, r#"{"job": {}}"#).unwrap_err();
        match err {
            AnnotationError::ManifestParse { line, reason, .. } => {
                assert_eq!(line, 4);
                assert!(reason.contains("source"));
            }
            other => panic!("Expected ManifestParse, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_record_rejects_bad_json() {
        assert!(matches!(
            entity_parser().parse_record(0, "{oops"),
            Err(AnnotationError::ManifestParse { .. })
        ));
    }

    #[test]
    fn test_document_size_counts_utf8_bytes() {
        let limits = ConversionLimits {
            max_document_bytes: 4,
            max_label_chars: 10,
        };
        let parser = ManifestLineParser::new("m", limits);
        // Two characters, four bytes.
        assert!(parser.parse_record(0, r#"{"source": "éé"}"#).is_ok());
        match parser.parse_record(1, r#"{"source": "ééé"}"#) {
            Err(AnnotationError::DocumentTooLarge { size, limit, .. }) => {
                assert_eq!(size, 6);
                assert_eq!(limit, 4);
            }
            other => panic!("Expected DocumentTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_entity_annotations_extracted_in_order() {
        let parser = entity_parser();
        let line = json!({
            "source": "Hello big world",
            "job": {"annotations": {"entities": [
                {"startOffset": 10, "endOffset": 15, "label": "place"},
                {"startOffset": 0.0, "endOffset": "5", "label": "greeting"}
            ]}}
        })
        .to_string();
        let record = parser.parse_record(2, &line).unwrap();
        let spans = parser.entity_annotations(&record, "dataset.csv").unwrap();

        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].label, "place");
        assert_eq!((spans[1].begin, spans[1].end), (0, 5));
        assert_eq!(spans[1].line, 2);
        assert_eq!(spans[1].file, "dataset.csv");
    }

    #[test]
    fn test_entity_annotations_require_label() {
        let parser = entity_parser();
        let line = r#"{"source": "Hi", "job": {"annotations": {"entities": [{"startOffset": 0, "endOffset": 1}]}}}"#;
        let record = parser.parse_record(0, line).unwrap();
        assert!(matches!(
            parser.entity_annotations(&record, "dataset.csv"),
            Err(AnnotationError::ManifestParse { .. })
        ));
    }

    #[test]
    fn test_missing_entities_list() {
        let parser = entity_parser();
        let record = parser
            .parse_record(0, r#"{"source": "Hi", "job": {"annotations": {}}}"#)
            .unwrap();
        assert!(parser.entity_annotations(&record, "dataset.csv").is_err());
    }

    #[test]
    fn test_class_name() {
        let parser = classifier_parser();
        let record = parser
            .parse_record(0, r#"{"source": "doc", "job": 1, "job-metadata": {"class-name": "invoice"}}"#)
            .unwrap();
        assert_eq!(parser.class_name(&record).unwrap(), "invoice");
    }

    #[test]
    fn test_empty_class_name() {
        let parser = classifier_parser();
        let record = parser
            .parse_record(3, r#"{"source": "doc", "job-metadata": {"class-name": ""}}"#)
            .unwrap();
        assert!(matches!(
            parser.class_name(&record),
            Err(AnnotationError::EmptyLabel { line: 3, .. })
        ));
    }

    #[test]
    fn test_label_too_long() {
        let limits = ConversionLimits {
            max_document_bytes: 100,
            max_label_chars: 3,
        };
        let parser = ManifestLineParser::new("m", limits);
        let record = parser
            .parse_record(0, r#"{"source": "doc", "job-metadata": {"class-name": "four"}}"#)
            .unwrap();
        assert!(matches!(
            parser.class_name(&record),
            Err(AnnotationError::LabelTooLong { length: 4, limit: 3, .. })
        ));
    }

    #[test]
    fn test_class_labels_joined() {
        let parser = classifier_parser();
        let record = parser
            .parse_record(
                0,
                r#"{"source": "doc", "job-metadata": {"class-map": {"0": "a", "1": "b"}}}"#,
            )
            .unwrap();
        assert_eq!(parser.class_labels(&record, "|").unwrap(), "a|b");
    }

    #[test]
    fn test_class_labels_empty_segment() {
        let parser = classifier_parser();
        let record = parser
            .parse_record(
                0,
                r#"{"source": "doc", "job-metadata": {"class-map": {"0": "a", "1": "", "2": "b"}}}"#,
            )
            .unwrap();
        assert!(matches!(
            parser.class_labels(&record, "|"),
            Err(AnnotationError::EmptyLabelInList { .. })
        ));
    }

    #[test]
    fn test_class_labels_empty_map() {
        let parser = classifier_parser();
        let record = parser
            .parse_record(0, r#"{"source": "doc", "job-metadata": {"class-map": {}}}"#)
            .unwrap();
        assert!(matches!(
            parser.class_labels(&record, "|"),
            Err(AnnotationError::EmptyLabel { .. })
        ));
        assert!(matches!(
            parser.class_labels(&record, ""),
            Err(AnnotationError::InvalidLabelDelimiter(_))
        ));
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("s3://bucket/dir/doc.json"), "doc.json");
        assert_eq!(basename("s3://bucket/dir/"), "dir");
        assert_eq!(basename("doc.json"), "doc.json");
    }

    #[test]
    fn test_annotation_manifest_entry() {
        let line = r#"{"source-ref": "s3://b/docs/a.pdf", "job": {"annotation-ref": "s3://b/ann/a.json"}}"#;
        let entry = AnnotationManifestEntry::parse(0, line, "output.manifest").unwrap();
        assert_eq!(entry.annotation_name(), "a.json");

        let local = entry.localize(Path::new("/data/docs"), Path::new("/data/ann"));
        assert_eq!(local.source_ref, "/data/docs/a.pdf");
        assert_eq!(local.annotation_ref, "/data/ann/a.json");
    }

    #[test]
    fn test_annotation_manifest_entry_requires_refs() {
        let missing_annotation = r#"{"source-ref": "s3://b/a.pdf", "job": {}}"#;
        assert!(AnnotationManifestEntry::parse(0, missing_annotation, "m").is_err());
        let missing_source = r#"{"job": {"annotation-ref": "s3://b/a.json"}}"#;
        assert!(AnnotationManifestEntry::parse(0, missing_source, "m").is_err());
    }
}
