//! Entity recognition conversion

use super::{write_output, Sources};
use crate::config::Config;
use anyhow::{Context as _, Result};
use clap::Args;
use gt_annotations_core::{
    basename, write_annotations_csv, write_dataset_csv, EntityRecognitionConverter,
};
use gt_annotations_storage::OutputTarget;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Args)]
pub struct ConvertEntitiesCommand {
    /// Dataset CSV destination (s3://bucket/path/dataset.csv)
    #[arg(value_name = "DATASET_OUTPUT_S3_URI")]
    dataset_output: OutputTarget,

    /// Annotations CSV destination (s3://bucket/path/annotations.csv)
    #[arg(value_name = "ANNOTATIONS_OUTPUT_S3_URI")]
    annotations_output: OutputTarget,

    /// Labeling job output manifest
    #[arg(long, default_value = "output.manifest")]
    manifest: PathBuf,

    /// Directory for the local copies of the CSVs [default: .]
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Upper-case entity labels
    #[arg(long)]
    uppercase_labels: bool,

    /// Also upload both CSVs to their S3 destinations
    #[arg(long)]
    upload: bool,
}

impl ConvertEntitiesCommand {
    pub async fn execute(self, config: &Config) -> Result<()> {
        let start = Instant::now();

        let manifest = tokio::fs::read_to_string(&self.manifest)
            .await
            .with_context(|| format!("Failed to read manifest {}", self.manifest.display()))?;

        let mut converter_config = config.entity_converter(self.uppercase_labels);
        converter_config.dataset_file_name = self.dataset_output.file_name().to_string();
        converter_config.manifest_file_name =
            basename(&self.manifest.to_string_lossy()).to_string();
        let converter = EntityRecognitionConverter::new(converter_config);

        let documents = converter.convert_manifest(&manifest)?;

        let mut dataset = Vec::new();
        write_dataset_csv(&mut dataset, &documents)?;
        let mut annotations = Vec::new();
        write_annotations_csv(
            &mut annotations,
            documents.iter().flat_map(|document| &document.annotations),
        )?;

        let output_dir = config.output_dir(self.output_dir);
        let mut sources = Sources::new(config.s3());
        let dataset_path =
            write_output(&self.dataset_output, &output_dir, dataset, &mut sources, self.upload)
                .await?;
        let annotations_path = write_output(
            &self.annotations_output,
            &output_dir,
            annotations,
            &mut sources,
            self.upload,
        )
        .await?;

        let spans: usize = documents.iter().map(|d| d.annotations.len()).sum();
        info!(
            documents = documents.len(),
            spans,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Entity recognition conversion complete"
        );
        println!(
            "Converted {} documents ({} entities): {}, {}",
            documents.len(),
            spans,
            dataset_path.display(),
            annotations_path.display()
        );
        Ok(())
    }
}
