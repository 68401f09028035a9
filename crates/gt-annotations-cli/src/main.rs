//! gt-annotations - Ground Truth annotation conversion and validation
//!
//! Converts labeling job output manifests into entity-recognition and
//! document-classification training data, validates semi-structured
//! annotation files, and renders entity overlays for visual inspection.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::convert_classifier::ConvertClassifierCommand;
use commands::convert_entities::ConvertEntitiesCommand;
use commands::validate_annotation::ValidateAnnotationCommand;
use commands::validate_manifest::ValidateManifestCommand;
use commands::visualize::VisualizeCommand;
use config::Config;

#[derive(Parser)]
#[command(
    name = "gt-annotations",
    version,
    about = "Convert and validate Ground Truth annotation jobs",
    long_about = "Convert labeling job output manifests into training data, validate\n\
                  semi-structured annotation files, and render entity overlays.\n\n\
                  Defaults can be set in .gt-annotations.toml (home directory, then\n\
                  project directory; --config overrides both).",
    after_help = "EXAMPLES:\n  \
                  # Entity recognition dataset + annotations\n  \
                  gt-annotations convert-entities s3://bucket/out/dataset.csv s3://bucket/out/annotations.csv\n\n  \
                  # Multi-label classification with a custom delimiter\n  \
                  gt-annotations convert-classifier MULTI_LABEL s3://bucket/out/train.csv ';'\n\n  \
                  # Validate a manifest against local copies of its files\n  \
                  gt-annotations validate-manifest --manifest-local-ref output.manifest \\\n      \
                  --documents-local-ref ./docs --annotations-local-ref ./annotations\n\n  \
                  # Draw entity boxes onto blank letter-size pages\n  \
                  gt-annotations visualize --annotation doc.json --output-dir viz --page-size 850x1100"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (overrides ~/.gt-annotations.toml and ./.gt-annotations.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an entity recognition manifest into dataset and annotations CSVs
    ConvertEntities(ConvertEntitiesCommand),

    /// Convert a classification manifest into a training CSV
    ConvertClassifier(ConvertClassifierCommand),

    /// Validate every annotation file referenced by a manifest
    ValidateManifest(ValidateManifestCommand),

    /// Validate a single annotation file, or every file under a prefix
    ValidateAnnotation(ValidateAnnotationCommand),

    /// Render entity bounding boxes over document pages
    Visualize(VisualizeCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {e}"))?;

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::ConvertEntities(cmd) => cmd.execute(&config).await,
        Commands::ConvertClassifier(cmd) => cmd.execute(&config).await,
        Commands::ValidateManifest(cmd) => cmd.execute(&config).await,
        Commands::ValidateAnnotation(cmd) => cmd.execute(&config).await,
        Commands::Visualize(cmd) => cmd.execute(&config),
    }
}
