//! CSV writers for converted training data.

use crate::convert::{ClassifiedDocument, ConvertedDocument};
use crate::error::Result;
use crate::manifest::EntityAnnotation;
use std::io::Write;

/// Header of the annotations CSV
pub const ANNOTATIONS_HEADER: [&str; 5] = ["File", "Line", "Begin Offset", "End Offset", "Type"];

/// Source text as a double-quoted, JSON-escaped field.
fn quoted_source(source: &str) -> Result<String> {
    Ok(serde_json::to_string(source)?)
}

/// Writes one row per document: the quoted, JSON-escaped source text.
pub fn write_dataset_csv<W: Write>(mut writer: W, documents: &[ConvertedDocument]) -> Result<()> {
    for document in documents {
        writeln!(writer, "{}", quoted_source(&document.source)?)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the header plus one row per entity span.
pub fn write_annotations_csv<'a, W, I>(writer: W, annotations: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a EntityAnnotation>,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(ANNOTATIONS_HEADER)?;
    for annotation in annotations {
        let line = annotation.line.to_string();
        let begin = annotation.begin.to_string();
        let end = annotation.end.to_string();
        csv_writer.write_record([
            annotation.file.as_str(),
            line.as_str(),
            begin.as_str(),
            end.as_str(),
            annotation.label.as_str(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes `label,"source"` rows.
pub fn write_classifier_csv<W: Write>(mut writer: W, documents: &[ClassifiedDocument]) -> Result<()> {
    for document in documents {
        writeln!(writer, "{},{}", document.labels, quoted_source(&document.source)?)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(begin: i64, end: i64, label: &str) -> EntityAnnotation {
        EntityAnnotation {
            file: "dataset.csv".to_string(),
            line: 0,
            begin,
            end,
            label: label.to_string(),
        }
    }

    #[test]
    fn test_dataset_rows_are_json_escaped() {
        let documents = vec![ConvertedDocument {
            source: "He said \"hi\"\nthen left, quickly".to_string(),
            annotations: Vec::new(),
        }];
        let mut out = Vec::new();
        write_dataset_csv(&mut out, &documents).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\"He said \\\"hi\\\"\\nthen left, quickly\"\n"
        );
    }

    #[test]
    fn test_annotations_csv() {
        let spans = vec![annotation(0, 5, "greeting"), annotation(6, 11, "a, b")];
        let mut out = Vec::new();
        write_annotations_csv(&mut out, &spans).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "File,Line,Begin Offset,End Offset,Type\n\
             dataset.csv,0,0,5,greeting\n\
             dataset.csv,0,6,11,\"a, b\"\n"
        );
    }

    #[test]
    fn test_annotations_csv_header_only() {
        let spans: Vec<EntityAnnotation> = Vec::new();
        let mut out = Vec::new();
        write_annotations_csv(&mut out, &spans).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "File,Line,Begin Offset,End Offset,Type\n"
        );
    }

    #[test]
    fn test_classifier_rows() {
        let documents = vec![
            ClassifiedDocument {
                labels: "invoice|receipt".to_string(),
                source: "Total: 5".to_string(),
            },
            ClassifiedDocument {
                labels: "memo".to_string(),
                source: "tab\there".to_string(),
            },
        ];
        let mut out = Vec::new();
        write_classifier_csv(&mut out, &documents).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "invoice|receipt,\"Total: 5\"\nmemo,\"tab\\there\"\n"
        );
    }
}
