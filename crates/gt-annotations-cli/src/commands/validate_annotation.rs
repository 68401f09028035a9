//! Single annotation file validation

use super::{report_summary, OutputFormat, Sources};
use crate::config::Config;
use anyhow::{bail, Context as _, Result};
use clap::{ArgGroup, Args};
use gt_annotations_core::{basename, validate_annotation, ValidationStats};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Args)]
#[command(group(
    ArgGroup::new("annotation")
        .required(true)
        .args(["annotation_s3_ref", "annotation_local_ref", "prefix"]),
))]
pub struct ValidateAnnotationCommand {
    /// Annotation file in S3 (s3://bucket/path/doc.json)
    #[arg(long, value_name = "URI")]
    annotation_s3_ref: Option<String>,

    /// Annotation file on the local filesystem
    #[arg(long, value_name = "PATH")]
    annotation_local_ref: Option<PathBuf>,

    /// Validate every object under this prefix (s3://bucket/dir/ or a local directory)
    #[arg(long, value_name = "URI")]
    prefix: Option<String>,

    /// Stop at the first invalid file or entity
    #[arg(long)]
    fail_on_invalid: bool,

    /// Summary output format [default: text]
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
}

impl ValidateAnnotationCommand {
    pub async fn execute(self, config: &Config) -> Result<()> {
        let start = Instant::now();
        let fail_on_invalid = config.fail_on_invalid(self.fail_on_invalid);
        let mut sources = Sources::new(config.s3());

        let references = if let Some(prefix) = &self.prefix {
            let listed = sources
                .for_reference(prefix)
                .await
                .list_objects(prefix)
                .await
                .with_context(|| format!("Failed to list {prefix}"))?;
            info!(prefix = %prefix, files = listed.len(), "Listed annotation files");
            listed
        } else if let Some(uri) = &self.annotation_s3_ref {
            vec![uri.clone()]
        } else if let Some(path) = &self.annotation_local_ref {
            vec![path.to_string_lossy().into_owned()]
        } else {
            bail!("One of --annotation-s3-ref, --annotation-local-ref or --prefix is required");
        };

        let mut stats = ValidationStats::new();
        for reference in &references {
            let content = sources
                .for_reference(reference)
                .await
                .get_object_content(reference)
                .await
                .with_context(|| format!("Failed to read {reference}"))?;
            validate_annotation(&content, basename(reference), &mut stats, fail_on_invalid)
                .with_context(|| format!("Annotation file {reference} is invalid"))?;
        }

        report_summary(&stats.summary(), config.output_format(self.format))?;
        info!(
            files = references.len(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Annotation validation complete"
        );
        Ok(())
    }
}
