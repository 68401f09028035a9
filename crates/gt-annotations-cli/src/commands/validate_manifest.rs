//! Manifest validation: every line's document and annotation file

use super::{report_summary, OutputFormat, Sources};
use crate::config::Config;
use anyhow::{anyhow, bail, Context as _, Result};
use clap::{ArgGroup, Args};
use gt_annotations_core::{
    basename, validate_annotation, AnnotationManifestEntry, ValidationStats,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};

#[derive(Args)]
#[command(group(
    ArgGroup::new("manifest")
        .required(true)
        .args(["manifest_s3_ref", "manifest_local_ref"]),
))]
pub struct ValidateManifestCommand {
    /// Manifest in S3 (s3://bucket/path/output.manifest)
    #[arg(long, value_name = "URI")]
    manifest_s3_ref: Option<String>,

    /// Manifest on the local filesystem
    #[arg(long, value_name = "PATH")]
    manifest_local_ref: Option<PathBuf>,

    /// Local directory holding the referenced source documents
    #[arg(long, value_name = "DIR", requires = "annotations_local_ref")]
    documents_local_ref: Option<PathBuf>,

    /// Local directory holding the referenced annotation files
    #[arg(long, value_name = "DIR", requires = "documents_local_ref")]
    annotations_local_ref: Option<PathBuf>,

    /// Stop at the first invalid line
    #[arg(long)]
    fail_on_invalid: bool,

    /// Summary output format [default: text]
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
}

impl ValidateManifestCommand {
    pub async fn execute(self, config: &Config) -> Result<()> {
        let start = Instant::now();
        let fail_on_invalid = config.fail_on_invalid(self.fail_on_invalid);
        let mut sources = Sources::new(config.s3());

        let manifest_ref = match (&self.manifest_s3_ref, &self.manifest_local_ref) {
            (Some(uri), _) => uri.clone(),
            (None, Some(path)) => path.to_string_lossy().into_owned(),
            (None, None) => bail!("One of --manifest-s3-ref or --manifest-local-ref is required"),
        };
        let manifest_file = basename(&manifest_ref).to_string();
        let manifest = sources
            .for_reference(&manifest_ref)
            .await
            .get_object_content(&manifest_ref)
            .await
            .with_context(|| format!("Failed to read manifest {manifest_ref}"))?;

        let local_dirs = self
            .documents_local_ref
            .as_deref()
            .zip(self.annotations_local_ref.as_deref());

        let mut stats = ValidationStats::new();
        let mut lines = 0usize;
        let mut invalid_lines = 0usize;
        for (index, line) in manifest.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            lines += 1;

            let outcome = match AnnotationManifestEntry::parse(index, line, &manifest_file) {
                Ok(entry) => {
                    let entry = match local_dirs {
                        Some((documents_dir, annotations_dir)) => {
                            entry.localize(documents_dir, annotations_dir)
                        }
                        None => entry,
                    };
                    validate_entry(&entry, &mut sources, &mut stats, fail_on_invalid).await
                }
                Err(e) => Err(e.into()),
            };

            if let Err(e) = outcome {
                invalid_lines += 1;
                if fail_on_invalid {
                    bail!("Manifest line {} is invalid: {e:#}", index + 1);
                }
                error!(line = index + 1, error = format!("{e:#}"), "Invalid manifest line");
            }
        }

        let summary = stats.summary();
        report_summary(&summary, config.output_format(self.format))?;
        info!(
            lines,
            invalid_lines,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Manifest validation complete"
        );
        Ok(())
    }
}

/// Checks both references exist, then validates the annotation file.
///
/// A line whose annotation file records invalid content is reported as an
/// error even when validation itself did not fail fast.
async fn validate_entry(
    entry: &AnnotationManifestEntry,
    sources: &mut Sources,
    stats: &mut ValidationStats,
    fail_on_invalid: bool,
) -> Result<()> {
    for reference in [&entry.source_ref, &entry.annotation_ref] {
        let exists = sources
            .for_reference(reference)
            .await
            .object_exists(reference)
            .await
            .with_context(|| format!("Failed to look up {reference}"))?;
        if !exists {
            bail!("Referenced object does not exist: {reference}");
        }
    }

    let content = sources
        .for_reference(&entry.annotation_ref)
        .await
        .get_object_content(&entry.annotation_ref)
        .await
        .with_context(|| format!("Failed to read {}", entry.annotation_ref))?;

    let name = entry.annotation_name();
    validate_annotation(&content, name, stats, fail_on_invalid)?;

    let file_stats = stats
        .file(name)
        .ok_or_else(|| anyhow!("No stats recorded for {name}"))?;
    if file_stats.invalid_format {
        bail!("Annotation file {name} failed schema validation");
    }
    if file_stats.has_invalid_entities() {
        bail!("Annotation file {name} contains invalid entities");
    }
    Ok(())
}
