//! Cross-checks entity text against the blocks it references.

use crate::error::{AnnotationError, Result};
use crate::model::{slice_chars, AnnotationDocument, BlockIndex, Entity};
use crate::stats::FileStats;
use std::collections::HashSet;
use tracing::{debug, error};

/// Separator between block ids in an entity's composite key.
///
/// ASCII unit separator, which never occurs in block ids, so `"a-b"` and
/// `["a", "b"]` produce different keys.
pub const COMPOSITE_KEY_SEPARATOR: &str = "\u{1f}";

/// Outcome of reconciling one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityVerdict {
    /// Line and word text both equal the entity text
    Valid,
    /// At least one of the joined texts differs from the entity text
    Invalid { line_text: String, word_text: String },
    /// An earlier entity referenced exactly the same blocks
    Duplicate,
}

/// Text gathered from an entity's block references
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferencedText {
    /// Line-level slices joined by single spaces
    pub line_text: String,
    /// Word-level slices joined by single spaces
    pub word_text: String,
    /// Referenced block and child ids joined by [`COMPOSITE_KEY_SEPARATOR`]
    pub composite_key: String,
}

/// Reconciles the entities of one document, remembering which block
/// combinations were already seen.
#[derive(Debug)]
pub struct EntityTextReconciler<'a> {
    index: BlockIndex<'a>,
    seen: HashSet<String>,
}

impl<'a> EntityTextReconciler<'a> {
    #[must_use]
    pub fn new(document: &'a AnnotationDocument) -> Self {
        Self {
            index: BlockIndex::new(&document.blocks),
            seen: HashSet::new(),
        }
    }

    /// Collects the line and word text an entity points at.
    ///
    /// A line block that does not resolve contributes nothing and its child
    /// references are skipped. A child that does not resolve contributes
    /// nothing. Both cases are logged.
    #[must_use]
    pub fn referenced_text(&self, entity: &Entity) -> ReferencedText {
        let mut line_slices = Vec::new();
        let mut word_slices = Vec::new();
        let mut ids: Vec<&str> = Vec::new();

        for reference in entity.block_references() {
            ids.push(&reference.block_id);
            let Some(line) = self.index.get(&reference.block_id) else {
                error!(block_id = %reference.block_id, "Line block not found");
                continue;
            };
            line_slices.push(slice_chars(
                line.text(),
                reference.begin_offset,
                reference.end_offset,
            ));

            for child in reference.child_blocks() {
                ids.push(&child.child_block_id);
                let Some(word) = self.index.get(&child.child_block_id) else {
                    error!(
                        block_id = %child.child_block_id,
                        parent_id = %reference.block_id,
                        "Word block not found"
                    );
                    continue;
                };
                word_slices.push(slice_chars(word.text(), child.begin_offset, child.end_offset));
            }
        }

        ReferencedText {
            line_text: line_slices.join(" "),
            word_text: word_slices.join(" "),
            composite_key: ids.join(COMPOSITE_KEY_SEPARATOR),
        }
    }

    /// Classifies `entity` and records its composite key.
    ///
    /// Duplicates are detected before text comparison, so a repeated entity
    /// is never counted twice.
    pub fn reconcile(&mut self, entity: &Entity) -> EntityVerdict {
        let ReferencedText {
            line_text,
            word_text,
            composite_key,
        } = self.referenced_text(entity);

        if !self.seen.insert(composite_key) {
            return EntityVerdict::Duplicate;
        }
        if line_text == entity.text && word_text == entity.text {
            EntityVerdict::Valid
        } else {
            EntityVerdict::Invalid {
                line_text,
                word_text,
            }
        }
    }
}

/// Reconciles every entity of `document`, recording counts into `stats`.
///
/// Every entity registers its type, duplicates included. With
/// `fail_on_invalid` the first mismatch is returned as
/// [`AnnotationError::TextMismatch`]; otherwise mismatches are only counted.
pub fn reconcile_document(
    document: &AnnotationDocument,
    file: &str,
    stats: &mut FileStats,
    fail_on_invalid: bool,
) -> Result<()> {
    let mut reconciler = EntityTextReconciler::new(document);

    for entity in &document.entities {
        stats.register(&entity.entity_type);

        match reconciler.reconcile(entity) {
            EntityVerdict::Valid => stats.record_valid(&entity.entity_type),
            EntityVerdict::Duplicate => {
                error!(
                    file = %file,
                    entity_type = %entity.entity_type,
                    text = %entity.text,
                    "Duplicate entity"
                );
            }
            EntityVerdict::Invalid {
                line_text,
                word_text,
            } => {
                error!(
                    file = %file,
                    entity_type = %entity.entity_type,
                    expected = %entity.text,
                    line_text = %line_text,
                    word_text = %word_text,
                    "Failed to validate entity"
                );
                stats.record_invalid(&entity.entity_type);

                if fail_on_invalid {
                    return Err(AnnotationError::TextMismatch {
                        file: file.to_string(),
                        entity_type: entity.entity_type.clone(),
                        expected: entity.text.clone(),
                        line_text,
                        word_text,
                    });
                }
            }
        }
    }

    debug!(file = %file, entities = document.entities.len(), "Reconciled annotation");
    Ok(())
}
