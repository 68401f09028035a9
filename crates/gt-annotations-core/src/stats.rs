//! Per-file and dataset-wide validation counters.
//!
//! [`ValidationStats`] is an explicit accumulator: each document updates its
//! own [`FileStats`], and partial accumulators built by independent workers
//! combine with [`ValidationStats::merge`]. Merging is associative and
//! order-independent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Valid/invalid counts for one entity type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub valid: u64,
    pub invalid: u64,
}

impl EntityCounts {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.valid + self.invalid
    }

    fn add(&mut self, other: Self) {
        self.valid += other.valid;
        self.invalid += other.invalid;
    }
}

/// Counters for one annotation file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStats {
    /// Set when the file failed schema validation
    pub invalid_format: bool,
    /// Counts keyed by entity type
    pub entities: BTreeMap<String, EntityCounts>,
}

impl FileStats {
    /// Makes sure `entity_type` has a (possibly zero) entry.
    pub fn register(&mut self, entity_type: &str) -> &mut EntityCounts {
        self.entities.entry(entity_type.to_string()).or_default()
    }

    pub fn record_valid(&mut self, entity_type: &str) {
        self.register(entity_type).valid += 1;
    }

    pub fn record_invalid(&mut self, entity_type: &str) {
        self.register(entity_type).invalid += 1;
    }

    #[must_use]
    pub fn counts(&self, entity_type: &str) -> EntityCounts {
        self.entities.get(entity_type).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn has_invalid_entities(&self) -> bool {
        self.entities.values().any(|c| c.invalid > 0)
    }

    fn merge(&mut self, other: Self) {
        self.invalid_format |= other.invalid_format;
        for (entity_type, counts) in other.entities {
            self.entities.entry(entity_type).or_default().add(counts);
        }
    }
}

/// Batch-scoped accumulator keyed by annotation file name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationStats {
    files: BTreeMap<String, FileStats>,
}

impl ValidationStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `file`, created empty on first use.
    pub fn file_mut(&mut self, file: &str) -> &mut FileStats {
        self.files.entry(file.to_string()).or_default()
    }

    #[must_use]
    pub fn file(&self, file: &str) -> Option<&FileStats> {
        self.files.get(file)
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &FileStats)> {
        self.files.iter().map(|(name, stats)| (name.as_str(), stats))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Folds `other` into `self`, summing counts per file and entity type.
    pub fn merge(&mut self, other: Self) {
        for (file, stats) in other.files {
            self.files.entry(file).or_default().merge(stats);
        }
    }

    /// Rolls per-file counts into dataset-wide totals.
    #[must_use]
    pub fn summary(&self) -> DatasetSummary {
        let mut summary = DatasetSummary::default();

        for (file, stats) in &self.files {
            if stats.invalid_format {
                summary.files_with_format_issues.push(file.clone());
            }
            if !stats.entities.is_empty() {
                summary
                    .file_totals
                    .insert(file.clone(), stats.entities.clone());
            }
            for (entity_type, counts) in &stats.entities {
                summary
                    .entity_totals
                    .entry(entity_type.clone())
                    .or_default()
                    .add(*counts);
                if counts.invalid > 0 {
                    summary
                        .files_with_invalid_entities
                        .entry(entity_type.clone())
                        .or_default()
                        .insert(file.clone(), counts.invalid);
                }
            }
        }

        summary
    }
}

/// Dataset-level view of a [`ValidationStats`] accumulator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    /// Annotation files that failed schema validation
    pub files_with_format_issues: Vec<String>,
    /// Totals per entity type across every file
    pub entity_totals: BTreeMap<String, EntityCounts>,
    /// entity type -> file -> number of invalid entities of that type
    pub files_with_invalid_entities: BTreeMap<String, BTreeMap<String, u64>>,
    /// file -> entity type -> counts
    pub file_totals: BTreeMap<String, BTreeMap<String, EntityCounts>>,
}

impl DatasetSummary {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.files_with_format_issues.is_empty() && self.files_with_invalid_entities.is_empty()
    }

    /// Emits the summary as `info` events.
    pub fn log(&self) {
        info!("Dataset aggregate stats");
        info!(
            files = ?self.files_with_format_issues,
            "Annotation files with format issues"
        );
        for (entity_type, files) in &self.files_with_invalid_entities {
            info!(entity_type = %entity_type, files = ?files, "Annotation files containing invalid entities");
        }
        for (entity_type, counts) in &self.entity_totals {
            info!(
                entity_type = %entity_type,
                valid = counts.valid,
                invalid = counts.invalid,
                "Entity totals"
            );
        }

        info!("Annotation file aggregate stats");
        for (file, entities) in &self.file_totals {
            for (entity_type, counts) in entities {
                info!(
                    file = %file,
                    entity_type = %entity_type,
                    valid = counts.valid,
                    invalid = counts.invalid,
                    "File entity counts"
                );
            }
        }
    }
}
