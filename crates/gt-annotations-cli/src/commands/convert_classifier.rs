//! Document classification conversion

use super::{write_output, Sources};
use crate::config::Config;
use anyhow::{Context as _, Result};
use clap::Args;
use gt_annotations_core::{basename, write_classifier_csv, ClassifierConverter, ClassifierMode};
use gt_annotations_storage::OutputTarget;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Args)]
pub struct ConvertClassifierCommand {
    /// MULTI_CLASS or MULTI_LABEL
    #[arg(value_name = "MODE")]
    mode: ClassifierMode,

    /// Training CSV destination (s3://bucket/path/train.csv)
    #[arg(value_name = "DATASET_OUTPUT_S3_URI")]
    dataset_output: OutputTarget,

    /// Delimiter joining labels in MULTI_LABEL mode [default: |]
    #[arg(value_name = "LABEL_DELIMITER")]
    label_delimiter: Option<String>,

    /// Labeling job output manifest
    #[arg(long, default_value = "output.manifest")]
    manifest: PathBuf,

    /// Directory for the local copy of the CSV [default: .]
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Also upload the CSV to its S3 destination
    #[arg(long)]
    upload: bool,
}

impl ConvertClassifierCommand {
    pub async fn execute(self, config: &Config) -> Result<()> {
        let start = Instant::now();
        let delimiter = config.label_delimiter(self.label_delimiter);

        let manifest = tokio::fs::read_to_string(&self.manifest)
            .await
            .with_context(|| format!("Failed to read manifest {}", self.manifest.display()))?;

        let mut converter_config = config.classifier_converter();
        converter_config.manifest_file_name =
            basename(&self.manifest.to_string_lossy()).to_string();
        let converter = ClassifierConverter::new(converter_config);

        let documents = converter.convert_manifest(&manifest, self.mode, &delimiter)?;

        let mut dataset = Vec::new();
        write_classifier_csv(&mut dataset, &documents)?;

        let output_dir = config.output_dir(self.output_dir);
        let mut sources = Sources::new(config.s3());
        let dataset_path =
            write_output(&self.dataset_output, &output_dir, dataset, &mut sources, self.upload)
                .await?;

        info!(
            mode = %self.mode,
            documents = documents.len(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Classification conversion complete"
        );
        println!(
            "Converted {} documents ({}): {}",
            documents.len(),
            self.mode,
            dataset_path.display()
        );
        Ok(())
    }
}
