//! Visual debugging overlays for entity annotations
//!
//! Draws each entity's aggregated bounding box and a floating type label on
//! top of the document's page images, and writes a JSON sidecar describing
//! what was drawn.
//!
//! The pipeline is:
//! 1. [`place_entities`] resolves every block reference to a page and a
//!    normalized box.
//! 2. [`ColorAssigner`] hands out one palette color per entity type.
//! 3. [`render_pages`] draws onto any [`AnnotationCanvas`], such as the
//!    raster [`ImageCanvas`].

use gt_annotations_core::AnnotationError;
use thiserror::Error;

pub mod canvas;
pub mod color;
pub mod placement;
pub mod render;
pub mod sidecar;

pub use canvas::{AnnotationCanvas, ImageCanvas, PixelRect};
pub use color::{ColorAssigner, EntityColor, PALETTE};
pub use placement::{place_entities, EntityPlacement, PageEntityMap};
pub use render::{render_pages, RenderOptions};
pub use sidecar::{LegendEntry, PageSidecar, PlacementInfo, VisualizationSidecar};

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid font {path}: {reason}")]
    InvalidFont { path: String, reason: String },

    #[error("Invalid page size {width}x{height}")]
    InvalidPageSize { width: u32, height: u32 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
