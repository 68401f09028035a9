//! JSON metadata written alongside rendered pages.

use crate::color::ColorAssigner;
use crate::RenderResult;
use gt_annotations_core::BoundingBox;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One drawn entity box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementInfo {
    pub entity_type: String,
    pub text: String,
    /// RGBA outline color
    pub color: [u8; 4],
    /// Normalized box
    pub bbox: BoundingBox,
}

/// Drawn entities of one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSidecar {
    /// 1-based page number
    pub page: u32,
    pub width: u32,
    pub height: u32,
    pub placements: Vec<PlacementInfo>,
}

/// Entity type to color legend entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub entity_type: String,
    pub color: [u8; 4],
}

/// Visualization sidecar metadata (JSON)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationSidecar {
    /// Annotation file the overlay was drawn from
    pub annotation: String,
    pub page_count: usize,
    /// Colors in assignment order
    pub legend: Vec<LegendEntry>,
    pub pages: Vec<PageSidecar>,
    /// Number of placements skipped because their page does not exist
    pub skipped_placements: usize,
    pub render_time_ms: f64,
}

impl VisualizationSidecar {
    #[must_use]
    pub fn new(
        annotation: impl Into<String>,
        page_count: usize,
        colors: &ColorAssigner,
        pages: Vec<PageSidecar>,
        total_placements: usize,
        render_time_ms: f64,
    ) -> Self {
        let legend = colors
            .assignments()
            .map(|(entity_type, color)| LegendEntry {
                entity_type: entity_type.to_string(),
                color: color.to_rgba().0,
            })
            .collect();
        let drawn: usize = pages.iter().map(|p| p.placements.len()).sum();
        Self {
            annotation: annotation.into(),
            page_count,
            legend,
            pages,
            skipped_placements: total_placements.saturating_sub(drawn),
            render_time_ms,
        }
    }

    /// Save sidecar JSON
    pub fn save(&self, path: &Path) -> RenderResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
