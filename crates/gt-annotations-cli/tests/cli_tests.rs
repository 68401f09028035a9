//! Integration tests for all CLI commands
//!
//! Every test runs against local files only; nothing is uploaded.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a CLI command isolated from any user/project config
fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gt-annotations"));
    cmd.current_dir(dir).env("HOME", dir).env_remove("RUST_LOG");
    cmd
}

fn entity_line(source: &str, entities: &Value) -> String {
    json!({
        "source": source,
        "labeling-job": {"annotations": {"entities": entities}},
        "labeling-job-metadata": {"job-name": "labeling-job"}
    })
    .to_string()
}

fn annotation_json(entity_text: &str) -> String {
    json!({
        "Version": "1",
        "DocumentType": "NATIVE_PDF",
        "DocumentMetadata": {},
        "Blocks": [
            {
                "Id": "l1", "BlockType": "LINE", "Text": "ACME Corp", "Page": 1,
                "Geometry": {"BoundingBox": {"Top": 0.1, "Left": 0.1, "Width": 0.2, "Height": 0.02}, "Polygon": []}
            },
            {
                "Id": "w1", "BlockType": "WORD", "Text": "ACME", "Page": 1,
                "Geometry": {"BoundingBox": {"Top": 0.1, "Left": 0.1, "Width": 0.1, "Height": 0.02}, "Polygon": []}
            },
            {
                "Id": "w2", "BlockType": "WORD", "Text": "Corp", "Page": 1,
                "Geometry": {"BoundingBox": {"Top": 0.1, "Left": 0.2, "Width": 0.1, "Height": 0.02}, "Polygon": []}
            }
        ],
        "Entities": [{
            "Text": entity_text,
            "Type": "ORG",
            "BlockReferences": [{
                "BlockId": "l1", "BeginOffset": 0, "EndOffset": 9,
                "ChildBlocks": [
                    {"ChildBlockId": "w1", "BeginOffset": 0, "EndOffset": 4},
                    {"ChildBlockId": "w2", "BeginOffset": 0, "EndOffset": 4}
                ]
            }]
        }]
    })
    .to_string()
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============ HELP ============

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    cli(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("convert-entities"))
        .stdout(predicate::str::contains("validate-manifest"))
        .stdout(predicate::str::contains("visualize"));
}

// ============ CONVERT-ENTITIES ============

#[test]
fn test_convert_entities_writes_both_csvs() {
    let dir = TempDir::new().unwrap();
    let manifest = format!(
        "{}\n{}\n",
        entity_line("Hello world", &json!([{"startOffset": 0, "endOffset": 5, "label": "greeting"}])),
        entity_line(
            "Pay \"ACME\" now",
            &json!([
                {"startOffset": 5, "endOffset": 9, "label": "org"},
                {"startOffset": 0, "endOffset": 3, "label": "verb"}
            ])
        ),
    );
    fs::write(dir.path().join("output.manifest"), manifest).unwrap();

    cli(dir.path())
        .args([
            "convert-entities",
            "s3://bucket/out/dataset.csv",
            "s3://bucket/out/annotations.csv",
            "--output-dir",
            "out",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Converted 2 documents (3 entities)"));

    let dataset = fs::read_to_string(dir.path().join("out/dataset.csv")).unwrap();
    assert_eq!(dataset, "\"Hello world\"\n\"Pay \\\"ACME\\\" now\"\n");

    let annotations = fs::read_to_string(dir.path().join("out/annotations.csv")).unwrap();
    assert_eq!(
        annotations,
        "File,Line,Begin Offset,End Offset,Type\n\
         dataset.csv,0,0,5,greeting\n\
         dataset.csv,1,0,3,verb\n\
         dataset.csv,1,5,9,org\n"
    );
}

#[test]
fn test_convert_entities_uppercase_labels() {
    let dir = TempDir::new().unwrap();
    let manifest = entity_line(
        "Hello world",
        &json!([{"startOffset": 0, "endOffset": 5, "label": "greeting"}]),
    );
    fs::write(dir.path().join("job.manifest"), manifest).unwrap();

    cli(dir.path())
        .args([
            "convert-entities",
            "s3://bucket/train.csv",
            "s3://bucket/labels.csv",
            "--manifest",
            "job.manifest",
            "--uppercase-labels",
        ])
        .assert()
        .success();

    let annotations = fs::read_to_string(dir.path().join("labels.csv")).unwrap();
    assert!(annotations.ends_with("train.csv,0,0,5,GREETING\n"));
}

#[test]
fn test_convert_entities_rejects_non_csv_target() {
    let dir = TempDir::new().unwrap();
    cli(dir.path())
        .args([
            "convert-entities",
            "s3://bucket/out/dataset.txt",
            "s3://bucket/out/annotations.csv",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid output location"));
}

#[test]
fn test_convert_entities_overlap_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let manifest = entity_line(
        "Hello world",
        &json!([
            {"startOffset": 0, "endOffset": 5, "label": "a"},
            {"startOffset": 3, "endOffset": 8, "label": "b"}
        ]),
    );
    fs::write(dir.path().join("output.manifest"), manifest).unwrap();

    cli(dir.path())
        .args([
            "convert-entities",
            "s3://bucket/dataset.csv",
            "s3://bucket/annotations.csv",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Overlapping annotations"));

    assert!(!dir.path().join("dataset.csv").exists());
}

#[test]
fn test_convert_entities_missing_manifest() {
    let dir = TempDir::new().unwrap();
    cli(dir.path())
        .args([
            "convert-entities",
            "s3://bucket/dataset.csv",
            "s3://bucket/annotations.csv",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read manifest"));
}

// ============ CONVERT-CLASSIFIER ============

fn classifier_manifest() -> String {
    [
        json!({"source": "Total: 5", "job-metadata": {"class-map": {"0": "invoice", "1": "receipt"}}}),
        json!({"source": "Meeting notes", "job-metadata": {"class-map": {"2": "memo"}}}),
    ]
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join("\n")
}

#[test]
fn test_convert_classifier_multi_label_default_delimiter() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("output.manifest"), classifier_manifest()).unwrap();

    cli(dir.path())
        .args(["convert-classifier", "MULTI_LABEL", "s3://bucket/train.csv"])
        .assert()
        .success();

    let csv = fs::read_to_string(dir.path().join("train.csv")).unwrap();
    assert_eq!(csv, "invoice|receipt,\"Total: 5\"\nmemo,\"Meeting notes\"\n");
}

#[test]
fn test_convert_classifier_delimiter_from_config() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("output.manifest"), classifier_manifest()).unwrap();
    fs::write(
        dir.path().join("custom.toml"),
        "[conversion]\nlabel_delimiter = \";\"\n",
    )
    .unwrap();

    cli(dir.path())
        .args([
            "--config",
            "custom.toml",
            "convert-classifier",
            "MULTI_LABEL",
            "s3://bucket/train.csv",
        ])
        .assert()
        .success();

    let csv = fs::read_to_string(dir.path().join("train.csv")).unwrap();
    assert!(csv.starts_with("invoice;receipt,"));
}

#[test]
fn test_convert_classifier_multi_class() {
    let dir = TempDir::new().unwrap();
    let manifest = json!({"source": "Total: 5", "job": 0, "job-metadata": {"class-name": "invoice"}});
    fs::write(dir.path().join("output.manifest"), manifest.to_string()).unwrap();

    cli(dir.path())
        .args(["convert-classifier", "MULTI_CLASS", "s3://bucket/train.csv"])
        .assert()
        .success();

    let csv = fs::read_to_string(dir.path().join("train.csv")).unwrap();
    assert_eq!(csv, "invoice,\"Total: 5\"\n");
}

#[test]
fn test_convert_classifier_rejects_unknown_mode() {
    let dir = TempDir::new().unwrap();
    cli(dir.path())
        .args(["convert-classifier", "SOMETIMES", "s3://bucket/train.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("MULTI_CLASS|MULTI_LABEL"));
}

// ============ VALIDATE-ANNOTATION ============

#[test]
fn test_validate_annotation_local_json_summary() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("doc.json"), annotation_json("ACME Corp")).unwrap();

    let output = cli(dir.path())
        .args([
            "validate-annotation",
            "--annotation-local-ref",
            "doc.json",
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary = stdout_json(&output);
    assert_eq!(summary["entity_totals"]["ORG"]["valid"], 1);
    assert_eq!(summary["files_with_format_issues"], json!([]));
}

#[test]
fn test_validate_annotation_mismatch_fail_fast() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("doc.json"), annotation_json("ACME Inc")).unwrap();

    cli(dir.path())
        .args([
            "validate-annotation",
            "--annotation-local-ref",
            "doc.json",
            "--fail-on-invalid",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not match its blocks"));
}

#[test]
fn test_validate_annotation_prefix_counts_every_file() {
    let dir = TempDir::new().unwrap();
    let annotations = dir.path().join("annotations");
    fs::create_dir_all(&annotations).unwrap();
    fs::write(annotations.join("a.json"), annotation_json("ACME Corp")).unwrap();
    fs::write(annotations.join("b.json"), annotation_json("ACME Inc")).unwrap();
    fs::write(annotations.join("c.json"), "{\"Version\": 1}").unwrap();

    let output = cli(dir.path())
        .args(["validate-annotation", "--prefix", "annotations", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary = stdout_json(&output);
    assert_eq!(summary["entity_totals"]["ORG"]["valid"], 1);
    assert_eq!(summary["entity_totals"]["ORG"]["invalid"], 1);
    assert_eq!(summary["files_with_format_issues"], json!(["c.json"]));
    assert_eq!(summary["files_with_invalid_entities"]["ORG"]["b.json"], 1);
}

#[test]
fn test_validate_annotation_requires_a_reference() {
    let dir = TempDir::new().unwrap();
    cli(dir.path()).arg("validate-annotation").assert().failure();
}

// ============ VALIDATE-MANIFEST ============

fn manifest_line(document: &str, annotation: &str) -> String {
    json!({
        "source-ref": format!("s3://bucket/documents/{document}"),
        "labeling-job": {"annotation-ref": format!("s3://bucket/annotations/{annotation}")},
        "labeling-job-metadata": {"job-name": "labeling-job"}
    })
    .to_string()
}

fn manifest_fixture(dir: &Path, lines: &[String]) {
    fs::create_dir_all(dir.join("documents")).unwrap();
    fs::create_dir_all(dir.join("annotations")).unwrap();
    fs::write(dir.join("documents/doc.pdf"), b"%PDF-1.4").unwrap();
    fs::write(dir.join("annotations/doc.json"), annotation_json("ACME Corp")).unwrap();
    fs::write(dir.join("output.manifest"), lines.join("\n")).unwrap();
}

#[test]
fn test_validate_manifest_with_local_refs() {
    let dir = TempDir::new().unwrap();
    manifest_fixture(dir.path(), &[manifest_line("doc.pdf", "doc.json")]);

    let output = cli(dir.path())
        .args([
            "validate-manifest",
            "--manifest-local-ref",
            "output.manifest",
            "--documents-local-ref",
            "documents",
            "--annotations-local-ref",
            "annotations",
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary = stdout_json(&output);
    assert_eq!(summary["file_totals"]["doc.json"]["ORG"]["valid"], 1);
}

#[test]
fn test_validate_manifest_missing_document_fail_fast() {
    let dir = TempDir::new().unwrap();
    manifest_fixture(
        dir.path(),
        &[
            manifest_line("doc.pdf", "doc.json"),
            manifest_line("missing.pdf", "doc.json"),
        ],
    );

    cli(dir.path())
        .args([
            "validate-manifest",
            "--manifest-local-ref",
            "output.manifest",
            "--documents-local-ref",
            "documents",
            "--annotations-local-ref",
            "annotations",
            "--fail-on-invalid",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Manifest line 2 is invalid"));
}

#[test]
fn test_validate_manifest_best_effort_continues() {
    let dir = TempDir::new().unwrap();
    manifest_fixture(
        dir.path(),
        &["{not json".to_string(), manifest_line("doc.pdf", "doc.json")],
    );

    let output = cli(dir.path())
        .args([
            "validate-manifest",
            "--manifest-local-ref",
            "output.manifest",
            "--documents-local-ref",
            "documents",
            "--annotations-local-ref",
            "annotations",
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["entity_totals"]["ORG"]["valid"], 1);
}

#[test]
fn test_validate_manifest_local_dirs_come_together() {
    let dir = TempDir::new().unwrap();
    cli(dir.path())
        .args([
            "validate-manifest",
            "--manifest-local-ref",
            "output.manifest",
            "--documents-local-ref",
            "documents",
        ])
        .assert()
        .failure();
}

// ============ VISUALIZE ============

#[test]
fn test_visualize_blank_pages() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("doc.json"), annotation_json("ACME Corp")).unwrap();

    cli(dir.path())
        .args([
            "visualize",
            "--annotation",
            "doc.json",
            "--output-dir",
            "viz",
            "--page-size",
            "200x300",
            "--page-count",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered 2 pages"));

    assert!(dir.path().join("viz/doc_page_1.png").exists());
    assert!(dir.path().join("viz/doc_page_2.png").exists());

    let sidecar: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("viz/doc.viz.json")).unwrap())
            .unwrap();
    assert_eq!(sidecar["page_count"], 2);
    assert_eq!(sidecar["legend"][0]["entity_type"], "ORG");
    assert_eq!(sidecar["pages"][0]["placements"][0]["text"], "ACME Corp");
    assert_eq!(sidecar["skipped_placements"], 0);
}

#[test]
fn test_visualize_requires_pages() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("doc.json"), annotation_json("ACME Corp")).unwrap();

    cli(dir.path())
        .args(["visualize", "--annotation", "doc.json", "--output-dir", "viz"])
        .assert()
        .failure();
}

#[test]
fn test_visualize_rejects_bad_page_size() {
    let dir = TempDir::new().unwrap();
    cli(dir.path())
        .args([
            "visualize",
            "--annotation",
            "doc.json",
            "--output-dir",
            "viz",
            "--page-size",
            "wide",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid page size"));
}
