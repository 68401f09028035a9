//! Subcommands and the helpers they share.

pub mod convert_classifier;
pub mod convert_entities;
pub mod validate_annotation;
pub mod validate_manifest;
pub mod visualize;

use anyhow::{Context as _, Result};
use clap::ValueEnum;
use gt_annotations_core::DatasetSummary;
use gt_annotations_storage::{LocalFileSource, ObjectSource, OutputTarget, S3Config, S3ObjectSource};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Output format for validation summaries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Summary logged as text
    #[default]
    Text,
    /// Summary additionally printed to stdout as JSON
    Json,
}

/// Picks the object source for a reference: S3 for `s3://` URIs, the local
/// filesystem otherwise. The S3 client is built on first use.
pub struct Sources {
    s3_config: S3Config,
    s3: Option<S3ObjectSource>,
    local: LocalFileSource,
}

impl Sources {
    pub fn new(s3_config: S3Config) -> Self {
        Self {
            s3_config,
            s3: None,
            local: LocalFileSource::new(),
        }
    }

    pub async fn s3(&mut self) -> &S3ObjectSource {
        let source = match self.s3.take() {
            Some(source) => source,
            None => S3ObjectSource::new(self.s3_config.clone()).await,
        };
        self.s3.insert(source)
    }

    pub async fn for_reference(&mut self, reference: &str) -> &dyn ObjectSource {
        if reference.starts_with("s3://") {
            return self.s3().await;
        }
        &self.local
    }
}

/// Writes converted CSV bytes to `<output_dir>/<target file name>` and, when
/// `upload` is set, to the target itself.
pub async fn write_output(
    target: &OutputTarget,
    output_dir: &Path,
    data: Vec<u8>,
    sources: &mut Sources,
    upload: bool,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let local_path = output_dir.join(target.file_name());
    tokio::fs::write(&local_path, &data)
        .await
        .with_context(|| format!("Failed to write {}", local_path.display()))?;
    info!(path = %local_path.display(), bytes = data.len(), "Wrote output");

    if upload {
        let uri = target.uri().to_string();
        sources
            .s3()
            .await
            .put_object_content(&uri, data)
            .await
            .with_context(|| format!("Failed to upload {uri}"))?;
        info!(uri = %uri, "Uploaded output");
    }
    Ok(local_path)
}

/// Logs the summary and, in JSON mode, prints it to stdout.
pub fn report_summary(summary: &DatasetSummary, format: OutputFormat) -> Result<()> {
    summary.log();
    if format == OutputFormat::Json {
        let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
        println!("{json}");
    }
    Ok(())
}
