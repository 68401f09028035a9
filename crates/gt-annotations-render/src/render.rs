//! Draws page entity placements onto a canvas.

use crate::canvas::{AnnotationCanvas, PixelRect};
use crate::color::ColorAssigner;
use crate::placement::PageEntityMap;
use crate::sidecar::{PageSidecar, PlacementInfo};
use crate::RenderResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Rendering options for overlays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Line thickness for bounding boxes
    pub line_thickness: u32,
    /// Font scale for labels
    pub font_scale: f32,
    /// Label background opacity (0-255)
    pub label_bg_opacity: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            line_thickness: 2,
            font_scale: 14.0,
            label_bg_opacity: 200,
        }
    }
}

/// Draws every placement and returns a sidecar entry per drawn page.
///
/// Colors are assigned in first-seen entity type order before drawing, so a
/// type keeps its color regardless of which page it first appears on.
/// Placements on pages the canvas does not have are skipped with a warning.
pub fn render_pages<C: AnnotationCanvas + ?Sized>(
    canvas: &mut C,
    placements: &PageEntityMap,
    colors: &mut ColorAssigner,
    options: &RenderOptions,
) -> RenderResult<Vec<PageSidecar>> {
    for entity_type in placements.entity_types() {
        colors.color_for(entity_type);
    }

    let mut drawn = Vec::new();
    for (page, page_placements) in placements.pages() {
        let Some((width, height)) = canvas.page_size(page) else {
            warn!(
                page,
                page_count = canvas.page_count(),
                skipped = page_placements.len(),
                "Entity page not in document, skipping"
            );
            continue;
        };

        let mut infos = Vec::with_capacity(page_placements.len());
        for placement in page_placements {
            let color = colors.color_for(&placement.entity_type);
            canvas.draw_box(
                page,
                PixelRect::entity_box(&placement.bbox, width, height),
                color,
                options,
            )?;
            canvas.draw_label(
                page,
                PixelRect::label_area(&placement.bbox, width, height),
                &placement.entity_type,
                color,
                options,
            )?;
            infos.push(PlacementInfo {
                entity_type: placement.entity_type.clone(),
                text: placement.text.clone(),
                color: color.to_rgba().0,
                bbox: placement.bbox,
            });
        }

        debug!(page, entities = infos.len(), "Rendered page");
        drawn.push(PageSidecar {
            page,
            width,
            height,
            placements: infos,
        });
    }

    Ok(drawn)
}
