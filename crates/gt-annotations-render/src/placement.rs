//! Resolution of entities to pages and page-relative boxes.

use crate::RenderResult;
use gt_annotations_core::{aggregate_block_reference, AnnotationDocument, BlockIndex, BoundingBox};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Page used when a referenced block has no page number
pub const DEFAULT_PAGE: u32 = 1;

/// One box to draw: an entity's block reference on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPlacement {
    pub entity_type: String,
    pub text: String,
    /// 1-based page number
    pub page: u32,
    pub bbox: BoundingBox,
}

/// Placements grouped by page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageEntityMap {
    pages: BTreeMap<u32, Vec<EntityPlacement>>,
    entity_types: Vec<String>,
}

impl PageEntityMap {
    pub fn push(&mut self, placement: EntityPlacement) {
        if !self.entity_types.contains(&placement.entity_type) {
            self.entity_types.push(placement.entity_type.clone());
        }
        self.pages.entry(placement.page).or_default().push(placement);
    }

    /// Pages in ascending order with their placements.
    pub fn pages(&self) -> impl Iterator<Item = (u32, &[EntityPlacement])> {
        self.pages
            .iter()
            .map(|(&page, placements)| (page, placements.as_slice()))
    }

    #[must_use]
    pub fn page(&self, page: u32) -> &[EntityPlacement] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or_default()
    }

    /// Entity types in the order they were first placed.
    #[must_use]
    pub fn entity_types(&self) -> &[String] {
        &self.entity_types
    }

    /// Total number of placements across pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Computes one placement per block reference of every entity.
///
/// The box is the aggregated box of the reference (child words when present)
/// and the page is that of the referenced block. Entities without block
/// references are skipped. A reference to a missing block fails the whole
/// document.
pub fn place_entities(document: &AnnotationDocument) -> RenderResult<PageEntityMap> {
    let index = BlockIndex::new(&document.blocks);
    let mut map = PageEntityMap::default();

    for entity in &document.entities {
        let references = entity.block_references();
        if references.is_empty() {
            warn!(entity_type = %entity.entity_type, text = %entity.text, "Entity has no block references, skipping");
            continue;
        }

        for reference in references {
            let bbox = aggregate_block_reference(reference, &index)?;
            let page = index
                .resolve(&reference.block_id)?
                .page
                .unwrap_or(DEFAULT_PAGE);

            map.push(EntityPlacement {
                entity_type: entity.entity_type.clone(),
                text: entity.text.clone(),
                page,
                bbox,
            });
        }
    }

    Ok(map)
}
