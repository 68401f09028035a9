//! Per-entity-type overlay colors.

use image::Rgba;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed overlay palette as RGB fractions, in assignment order
pub const PALETTE: [[f32; 3]; 5] = [
    [1.0, 112.0 / 255.0, 166.0 / 255.0],          // Pink
    [252.0 / 255.0, 122.0 / 255.0, 87.0 / 255.0], // Coral
    [0.0, 139.0 / 255.0, 248.0 / 255.0],          // Blue
    [199.0 / 255.0, 62.0 / 255.0, 29.0 / 255.0],  // Rust
    [102.0 / 255.0, 16.0 / 255.0, 242.0 / 255.0], // Violet
];

/// RGB color with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl EntityColor {
    #[inline]
    #[must_use]
    pub const fn from_components([r, g, b]: [f32; 3]) -> Self {
        Self { r, g, b }
    }

    /// Opaque 8-bit RGBA.
    #[must_use]
    pub fn to_rgba(self) -> Rgba<u8> {
        self.with_alpha(255)
    }

    #[must_use]
    pub fn with_alpha(self, alpha: u8) -> Rgba<u8> {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([channel(self.r), channel(self.g), channel(self.b), alpha])
    }
}

/// First-come-first-served color assignment, one color per entity type.
///
/// After the palette is exhausted, assignment wraps around to its start.
#[derive(Debug, Clone, Default)]
pub struct ColorAssigner {
    assigned: HashMap<String, usize>,
    order: Vec<String>,
}

impl ColorAssigner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Color for `entity_type`, assigning the next palette slot on first use.
    pub fn color_for(&mut self, entity_type: &str) -> EntityColor {
        let slot = match self.assigned.get(entity_type) {
            Some(&slot) => slot,
            None => {
                let slot = self.order.len() % PALETTE.len();
                self.assigned.insert(entity_type.to_string(), slot);
                self.order.push(entity_type.to_string());
                slot
            }
        };
        EntityColor::from_components(PALETTE[slot])
    }

    /// Color of an already-seen type, without assigning.
    #[must_use]
    pub fn get(&self, entity_type: &str) -> Option<EntityColor> {
        self.assigned
            .get(entity_type)
            .map(|&slot| EntityColor::from_components(PALETTE[slot]))
    }

    /// Assigned types in first-seen order with their colors.
    pub fn assignments(&self) -> impl Iterator<Item = (&str, EntityColor)> + '_ {
        self.order.iter().map(|entity_type| {
            let slot = self.assigned[entity_type];
            (entity_type.as_str(), EntityColor::from_components(PALETTE[slot]))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
