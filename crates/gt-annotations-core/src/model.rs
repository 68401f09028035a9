//! Semi-structured annotation documents: OCR blocks and the entities that
//! reference them.
//!
//! Field names follow the annotation file format (`Blocks`, `BlockType`,
//! `BlockReferences`, ...). Unknown fields are ignored on load.

use crate::error::{AnnotationError, Result};
use crate::geometry::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Kind of OCR block
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockType {
    Word,
    Line,
    /// Any other block kind (PAGE, KEY_VALUE_SET, ...)
    Other(String),
}

impl BlockType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Word => "WORD",
            Self::Line => "LINE",
            Self::Other(name) => name,
        }
    }

    /// WORD and LINE blocks must carry non-empty text.
    #[must_use]
    pub const fn requires_text(&self) -> bool {
        matches!(self, Self::Word | Self::Line)
    }
}

impl From<String> for BlockType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "WORD" => Self::Word,
            "LINE" => Self::Line,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for BlockType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<BlockType> for String {
    fn from(value: BlockType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed link from one block to others (e.g. a LINE to its CHILD words)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Relationship {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<String>,
}

/// OCR-derived structural unit of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    pub id: String,
    pub block_type: BlockType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// 1-based page number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub geometry: Geometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Vec<Relationship>>,
}

impl Block {
    /// Block text, empty when absent.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// Reference from a block reference to one of its WORD children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChildBlockReference {
    pub child_block_id: String,
    pub begin_offset: i64,
    pub end_offset: i64,
}

/// Reference from an entity to a (LINE) block and a character range in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockReference {
    pub block_id: String,
    pub begin_offset: i64,
    pub end_offset: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_blocks: Option<Vec<ChildBlockReference>>,
}

impl BlockReference {
    /// Child references, empty when absent or null.
    #[must_use]
    pub fn child_blocks(&self) -> &[ChildBlockReference] {
        self.child_blocks.as_deref().unwrap_or_default()
    }
}

/// Annotated span of document text with a semantic type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Entity {
    pub text: String,
    #[serde(rename = "Type")]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_references: Option<Vec<BlockReference>>,
}

impl Entity {
    /// Block references in annotation order, empty when absent or null.
    #[must_use]
    pub fn block_references(&self) -> &[BlockReference] {
        self.block_references.as_deref().unwrap_or_default()
    }
}

/// One annotation file: the document's blocks plus the labeled entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnnotationDocument {
    pub version: String,
    pub document_type: String,
    pub document_metadata: serde_json::Map<String, serde_json::Value>,
    pub blocks: Vec<Block>,
    pub entities: Vec<Entity>,
}

/// Document-scoped lookup from block id to block.
///
/// When ids repeat, the last block with a given id wins.
#[derive(Debug, Clone)]
pub struct BlockIndex<'a> {
    blocks: HashMap<&'a str, &'a Block>,
}

impl<'a> BlockIndex<'a> {
    #[must_use]
    pub fn new(blocks: &'a [Block]) -> Self {
        Self {
            blocks: blocks.iter().map(|b| (b.id.as_str(), b)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&'a Block> {
        self.blocks.get(id).copied()
    }

    /// Like [`get`](Self::get) but a missing id is an error.
    pub fn resolve(&self, id: &str) -> Result<&'a Block> {
        self.get(id).ok_or_else(|| AnnotationError::MissingBlock {
            block_id: id.to_string(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Character slice `text[begin..end]` with sequence-slice semantics.
///
/// Offsets count Unicode scalar values. Negative offsets count from the end,
/// out-of-range offsets clamp to the text bounds, and `begin >= end` yields an
/// empty string.
#[must_use]
pub fn slice_chars(text: &str, begin: i64, end: i64) -> String {
    let len = text.chars().count() as i64;
    let clamp = |offset: i64| -> i64 {
        if offset < 0 {
            (offset + len).max(0)
        } else {
            offset.min(len)
        }
    };
    let (begin, end) = (clamp(begin), clamp(end));
    if begin >= end {
        return String::new();
    }
    text.chars()
        .skip(begin as usize)
        .take((end - begin) as usize)
        .collect()
}
