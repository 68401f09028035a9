//! Entity overlay rendering

use crate::config::Config;
use anyhow::{bail, Context as _, Result};
use clap::{ArgGroup, Args};
use gt_annotations_core::parse_annotation;
use gt_annotations_render::{
    place_entities, render_pages, ColorAssigner, ImageCanvas, VisualizationSidecar,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;
use tracing::info;

/// Page size in pixels, written `WIDTHxHEIGHT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize {
    pub width: u32,
    pub height: u32,
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || format!("invalid page size {s:?}, expected WIDTHxHEIGHT (e.g. 850x1100)");
        let (width, height) = s.split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = width.trim().parse().map_err(|_| invalid())?;
        let height: u32 = height.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("pages")
        .required(true)
        .args(["page_image", "page_size"]),
))]
pub struct VisualizeCommand {
    /// Annotation file to draw
    #[arg(long, value_name = "PATH")]
    annotation: PathBuf,

    /// Directory for rendered pages and the sidecar JSON
    #[arg(long, value_name = "DIR")]
    output_dir: PathBuf,

    /// Page images in page order (repeatable)
    #[arg(long, value_name = "PNG", num_args = 1..)]
    page_image: Vec<PathBuf>,

    /// Draw on blank pages of this size
    #[arg(long, value_name = "WxH")]
    page_size: Option<PageSize>,

    /// Number of blank pages [default: highest page with entities]
    #[arg(long, value_name = "N", requires = "page_size")]
    page_count: Option<usize>,

    /// TrueType/OpenType font for label text
    #[arg(long, value_name = "TTF")]
    font: Option<PathBuf>,
}

impl VisualizeCommand {
    pub fn execute(self, config: &Config) -> Result<()> {
        let start = Instant::now();

        let annotation_name = self
            .annotation
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.annotation.display().to_string());
        let content = std::fs::read_to_string(&self.annotation)
            .with_context(|| format!("Failed to read {}", self.annotation.display()))?;
        let document = parse_annotation(&content, &annotation_name)?;
        let placements = place_entities(&document)?;

        let mut canvas = if let Some(size) = self.page_size {
            let highest = placements.pages().map(|(page, _)| page).max().unwrap_or(1);
            let count = self.page_count.unwrap_or(highest as usize);
            ImageCanvas::blank(count, size.width, size.height)?
        } else if !self.page_image.is_empty() {
            ImageCanvas::open_pages(&self.page_image).context("Failed to load page images")?
        } else {
            bail!("Either --page-image or --page-size is required");
        };
        if let Some(font) = config.font(self.font) {
            canvas = canvas
                .with_font_path(&font)
                .with_context(|| format!("Failed to load font {}", font.display()))?;
        }

        let mut colors = ColorAssigner::new();
        let options = config.render_options();
        let pages = render_pages(&mut canvas, &placements, &mut colors, &options)?;

        let stem = self
            .annotation
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "annotation".to_string());
        let written = canvas
            .save_pages(&self.output_dir, &stem)
            .context("Failed to save rendered pages")?;

        let render_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        let sidecar = VisualizationSidecar::new(
            annotation_name,
            canvas.pages().len(),
            &colors,
            pages,
            placements.len(),
            render_time_ms,
        );
        let sidecar_path = self.output_dir.join(format!("{stem}.viz.json"));
        sidecar.save(&sidecar_path).context("Failed to save sidecar")?;

        info!(
            pages = written.len(),
            entities = placements.len(),
            skipped = sidecar.skipped_placements,
            render_time_ms,
            "Visualization complete"
        );
        println!(
            "Rendered {} pages to {} ({})",
            written.len(),
            self.output_dir.display(),
            sidecar_path.display()
        );
        Ok(())
    }
}
