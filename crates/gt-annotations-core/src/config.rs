//! Converter configuration.

use serde::{Deserialize, Serialize};

/// Maximum UTF-8 size of an entity-recognition document
pub const DEFAULT_ENTITY_DOCUMENT_BYTES: usize = 5000;
/// Maximum UTF-8 size of a classification document (10 MiB)
pub const DEFAULT_CLASSIFIER_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;
/// Maximum label length in characters
pub const DEFAULT_LABEL_CHARS: usize = 5000;

/// Size ceilings enforced while parsing manifest records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionLimits {
    pub max_document_bytes: usize,
    pub max_label_chars: usize,
}

impl ConversionLimits {
    #[must_use]
    pub const fn entity_recognition() -> Self {
        Self {
            max_document_bytes: DEFAULT_ENTITY_DOCUMENT_BYTES,
            max_label_chars: DEFAULT_LABEL_CHARS,
        }
    }

    #[must_use]
    pub const fn classification() -> Self {
        Self {
            max_document_bytes: DEFAULT_CLASSIFIER_DOCUMENT_BYTES,
            max_label_chars: DEFAULT_LABEL_CHARS,
        }
    }
}

/// Casing applied to entity labels in converted output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelCase {
    /// Labels are written as annotated
    #[default]
    Preserve,
    /// Labels are upper-cased
    Upper,
}

impl LabelCase {
    #[must_use]
    pub fn apply(self, label: &str) -> String {
        match self {
            Self::Preserve => label.to_string(),
            Self::Upper => label.to_uppercase(),
        }
    }
}

/// Settings for [`EntityRecognitionConverter`](crate::convert::EntityRecognitionConverter)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConverterConfig {
    /// File name written into the `File` column of the annotations CSV
    pub dataset_file_name: String,
    /// Manifest name used in error messages
    pub manifest_file_name: String,
    pub limits: ConversionLimits,
    pub label_case: LabelCase,
}

impl Default for EntityConverterConfig {
    fn default() -> Self {
        Self {
            dataset_file_name: "dataset.csv".to_string(),
            manifest_file_name: "output.manifest".to_string(),
            limits: ConversionLimits::entity_recognition(),
            label_case: LabelCase::default(),
        }
    }
}

/// Settings for [`ClassifierConverter`](crate::convert::ClassifierConverter)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConverterConfig {
    pub manifest_file_name: String,
    pub limits: ConversionLimits,
}

impl Default for ClassifierConverterConfig {
    fn default() -> Self {
        Self {
            manifest_file_name: "output.manifest".to_string(),
            limits: ConversionLimits::classification(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let entity = EntityConverterConfig::default();
        assert_eq!(entity.limits.max_document_bytes, 5000);
        assert_eq!(entity.label_case, LabelCase::Preserve);

        let classifier = ClassifierConverterConfig::default();
        assert_eq!(classifier.limits.max_document_bytes, 10_485_760);
        assert_eq!(classifier.limits.max_label_chars, 5000);
    }

    #[test]
    fn test_label_case() {
        assert_eq!(LabelCase::Preserve.apply("greeting"), "greeting");
        assert_eq!(LabelCase::Upper.apply("greeting"), "GREETING");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EntityConverterConfig =
            serde_json::from_str(r#"{"label_case": "upper"}"#).unwrap();
        assert_eq!(config.label_case, LabelCase::Upper);
        assert_eq!(config.dataset_file_name, "dataset.csv");
    }
}
