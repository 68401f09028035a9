//! Structural validation of annotation documents.
//!
//! The validator walks the decoded JSON and reports every violation it finds
//! together with the path of the offending value (`Blocks[3].Geometry.Polygon`).
//! Extra fields are ignored. Only after the shape is known to be correct is the
//! document converted into the typed [`AnnotationDocument`] model.

use crate::error::{AnnotationError, Result};
use crate::model::{AnnotationDocument, BlockType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One structural problem at a JSON path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "$: {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Whether a field may be absent, and whether it may be `null`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Required,
    Optional,
    Nullable,
}

#[derive(Default)]
struct Walker {
    violations: Vec<SchemaViolation>,
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

impl Walker {
    fn fail(&mut self, path: &str, message: &str) {
        self.violations.push(SchemaViolation::new(path, message));
    }

    /// Looks up `key`, recording a violation when presence rules are broken.
    /// Returns `None` for absent/null values that are allowed.
    fn field<'v>(
        &mut self,
        object: &'v Map<String, Value>,
        path: &str,
        key: &str,
        presence: Presence,
    ) -> Option<&'v Value> {
        let field_path = child_path(path, key);
        match (object.get(key), presence) {
            (None, Presence::Required) => {
                self.fail(&field_path, "missing required field");
                None
            }
            (None, _) => None,
            (Some(Value::Null), Presence::Nullable) => None,
            (Some(Value::Null), _) => {
                self.fail(&field_path, "field may not be null");
                None
            }
            (Some(value), _) => Some(value),
        }
    }

    fn object<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Map<String, Value>> {
        let object = value.as_object();
        if object.is_none() {
            self.fail(path, "not an object");
        }
        object
    }

    fn list<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Vec<Value>> {
        let list = value.as_array();
        if list.is_none() {
            self.fail(path, "not a list");
        }
        list
    }

    fn string<'v>(
        &mut self,
        object: &'v Map<String, Value>,
        path: &str,
        key: &str,
        presence: Presence,
    ) -> Option<&'v str> {
        let value = self.field(object, path, key, presence)?;
        let text = value.as_str();
        if text.is_none() {
            self.fail(&child_path(path, key), "not a valid string");
        }
        text
    }

    fn integer(
        &mut self,
        object: &Map<String, Value>,
        path: &str,
        key: &str,
        presence: Presence,
    ) -> Option<i64> {
        let value = self.field(object, path, key, presence)?;
        let number = value.as_i64();
        if number.is_none() {
            self.fail(&child_path(path, key), "not a valid integer");
        }
        number
    }

    fn number(
        &mut self,
        object: &Map<String, Value>,
        path: &str,
        key: &str,
        presence: Presence,
    ) -> Option<f64> {
        let value = self.field(object, path, key, presence)?;
        let number = value.as_f64();
        if number.is_none() {
            self.fail(&child_path(path, key), "not a valid number");
        }
        number
    }

    /// Visits each element of a list field with `visit(walker, element, element_path)`.
    fn each<F>(
        &mut self,
        object: &Map<String, Value>,
        path: &str,
        key: &str,
        presence: Presence,
        mut visit: F,
    ) where
        F: FnMut(&mut Self, &Value, &str),
    {
        let field_path = child_path(path, key);
        let Some(value) = self.field(object, path, key, presence) else {
            return;
        };
        let Some(items) = self.list(value, &field_path) else {
            return;
        };
        for (i, item) in items.iter().enumerate() {
            visit(self, item, &format!("{field_path}[{i}]"));
        }
    }

    fn document(&mut self, value: &Value) {
        let Some(root) = self.object(value, "") else {
            return;
        };
        self.string(root, "", "Version", Presence::Required);
        self.string(root, "", "DocumentType", Presence::Required);
        if let Some(metadata) = self.field(root, "", "DocumentMetadata", Presence::Required) {
            self.object(metadata, "DocumentMetadata");
        }
        self.each(root, "", "Blocks", Presence::Required, Self::block);
        self.each(root, "", "Entities", Presence::Required, Self::entity);
    }

    fn block(&mut self, value: &Value, path: &str) {
        let Some(block) = self.object(value, path) else {
            return;
        };
        let before = self.violations.len();

        self.string(block, path, "Id", Presence::Required);
        let block_type = self.string(block, path, "BlockType", Presence::Required);
        let text = self.string(block, path, "Text", Presence::Nullable);
        if let Some(page) = self.integer(block, path, "Page", Presence::Nullable) {
            if page < 1 || page > i64::from(u32::MAX) {
                self.fail(&child_path(path, "Page"), "must be a positive integer");
            }
        }
        if let Some(geometry) = self.field(block, path, "Geometry", Presence::Required) {
            self.geometry(geometry, &child_path(path, "Geometry"));
        }
        self.each(block, path, "Relationships", Presence::Nullable, Self::relationship);

        // Text presence is only meaningful once the block's shape is sound.
        if self.violations.len() == before {
            if let Some(block_type) = block_type {
                if BlockType::from(block_type).requires_text() && text.map_or(true, str::is_empty) {
                    self.fail(
                        &child_path(path, "Text"),
                        "Text must be present for WORD and LINE blocks",
                    );
                }
            }
        }
    }

    fn geometry(&mut self, value: &Value, path: &str) {
        let Some(geometry) = self.object(value, path) else {
            return;
        };
        if let Some(bbox) = self.field(geometry, path, "BoundingBox", Presence::Required) {
            let bbox_path = child_path(path, "BoundingBox");
            if let Some(bbox) = self.object(bbox, &bbox_path) {
                for key in ["Width", "Top", "Height", "Left"] {
                    self.number(bbox, &bbox_path, key, Presence::Required);
                }
            }
        }
        self.each(geometry, path, "Polygon", Presence::Required, |walker, point, point_path| {
            if let Some(point) = walker.object(point, point_path) {
                walker.number(point, point_path, "X", Presence::Required);
                walker.number(point, point_path, "Y", Presence::Required);
            }
        });
    }

    fn relationship(&mut self, value: &Value, path: &str) {
        let Some(relationship) = self.object(value, path) else {
            return;
        };
        self.each(relationship, path, "Ids", Presence::Optional, |walker, id, id_path| {
            if !id.is_string() {
                walker.fail(id_path, "not a valid string");
            }
        });
        self.string(relationship, path, "Type", Presence::Optional);
    }

    fn entity(&mut self, value: &Value, path: &str) {
        let Some(entity) = self.object(value, path) else {
            return;
        };
        self.string(entity, path, "Text", Presence::Required);
        self.string(entity, path, "Type", Presence::Required);
        self.number(entity, path, "Score", Presence::Nullable);
        self.each(entity, path, "BlockReferences", Presence::Nullable, Self::block_reference);
    }

    fn block_reference(&mut self, value: &Value, path: &str) {
        let Some(reference) = self.object(value, path) else {
            return;
        };
        self.string(reference, path, "BlockId", Presence::Required);
        self.integer(reference, path, "BeginOffset", Presence::Required);
        self.integer(reference, path, "EndOffset", Presence::Required);
        self.each(reference, path, "ChildBlocks", Presence::Nullable, |walker, child, child_path| {
            if let Some(child) = walker.object(child, child_path) {
                walker.string(child, child_path, "ChildBlockId", Presence::Required);
                walker.integer(child, child_path, "BeginOffset", Presence::Required);
                walker.integer(child, child_path, "EndOffset", Presence::Required);
            }
        });
    }
}

/// Checks the structural shape of a decoded annotation document.
///
/// Returns every violation found, in document order.
pub fn validate_schema(value: &Value) -> std::result::Result<(), Vec<SchemaViolation>> {
    let mut walker = Walker::default();
    walker.document(value);
    if walker.violations.is_empty() {
        Ok(())
    } else {
        Err(walker.violations)
    }
}

/// Decodes, schema-checks and types one annotation file.
///
/// Malformed JSON is reported as a schema violation at the document root.
pub fn parse_annotation(content: &str, file: &str) -> Result<AnnotationDocument> {
    let schema_error = |violations| AnnotationError::SchemaViolation {
        file: file.to_string(),
        violations,
    };

    let value: Value = serde_json::from_str(content).map_err(|e| {
        schema_error(vec![SchemaViolation::new("", format!("invalid JSON: {e}"))])
    })?;
    validate_schema(&value).map_err(schema_error)?;

    serde_json::from_value(value)
        .map_err(|e| schema_error(vec![SchemaViolation::new("", e.to_string())]))
}
