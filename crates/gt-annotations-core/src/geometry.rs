//! Normalized page geometry and multi-block bounding-box aggregation.

use crate::error::Result;
use crate::model::{BlockIndex, BlockReference};
use serde::{Deserialize, Serialize};

/// Bounding box in normalized page coordinates (0.0 to 1.0, origin top-left)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoundingBox {
    /// Top edge as a fraction of page height
    pub top: f64,
    /// Left edge as a fraction of page width
    pub left: f64,
    /// Width as a fraction of page width
    pub width: f64,
    /// Height as a fraction of page height
    pub height: f64,
}

impl BoundingBox {
    /// Creates a new `BoundingBox` from its top-left corner and extent.
    #[inline]
    #[must_use = "creates a new BoundingBox"]
    pub const fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// Creates a `BoundingBox` from its four edges.
    #[inline]
    #[must_use = "creates a BoundingBox from edges"]
    pub fn from_edges(top: f64, left: f64, right: f64, bottom: f64) -> Self {
        Self::new(top, left, right - left, bottom - top)
    }

    /// Right edge (`left + width`).
    #[inline]
    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Bottom edge (`top + height`).
    #[inline]
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Smallest box containing both `self` and `other`.
    #[must_use = "returns the union of the two boxes"]
    pub fn union(&self, other: &Self) -> Self {
        Self::from_edges(
            self.top.min(other.top),
            self.left.min(other.left),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Whether `other` lies entirely inside `self`.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.top <= other.top
            && self.left <= other.left
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    /// Union of every box in `boxes`, or `None` when the iterator is empty.
    pub fn union_all<'a, I>(boxes: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        boxes
            .into_iter()
            .fold(None, |acc: Option<Self>, bbox| match acc {
                Some(current) => Some(current.union(bbox)),
                None => Some(*bbox),
            })
    }
}

/// Single (x, y) vertex of a block polygon
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Block geometry: axis-aligned box plus the detected polygon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Geometry {
    pub bounding_box: BoundingBox,
    pub polygon: Vec<Point>,
}

/// Computes the bounding box covered by a single block reference.
///
/// A reference without child blocks yields its block's box unchanged. With
/// child blocks, the result is the union of the child word boxes. Any id that
/// does not resolve is a [`MissingBlock`](crate::AnnotationError::MissingBlock)
/// error; no partial box is produced.
pub fn aggregate_block_reference(
    reference: &BlockReference,
    index: &BlockIndex<'_>,
) -> Result<BoundingBox> {
    let block = index.resolve(&reference.block_id)?;

    let children = reference.child_blocks();
    if children.is_empty() {
        return Ok(block.geometry.bounding_box);
    }

    let child_boxes = children
        .iter()
        .map(|child| Ok(index.resolve(&child.child_block_id)?.geometry.bounding_box))
        .collect::<Result<Vec<_>>>()?;

    Ok(BoundingBox::union_all(&child_boxes).unwrap_or(block.geometry.bounding_box))
}
