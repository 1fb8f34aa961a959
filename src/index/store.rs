//! IndexStore - the derived selector structures and their two update paths
//!
//! - **rebuild** replaces everything from a finished dispatch
//! - **patch** folds one freshly parsed document into the existing state,
//!   diffing against the snapshot taken at the last rebuild
//!
//! The store is a plain value: callers serialize access (see
//! [`SelectorIndex`](crate::SelectorIndex)).

use super::dispatcher::{DispatchReport, ParseFailure, ParsedDocument};
use super::SelectorLookup;
use crate::extractors::{normalize_selector, DocumentId, SelectorDefinition, SelectorKind};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Latest parse of one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub location: DocumentId,
    pub kind: String,
    pub definitions: Vec<SelectorDefinition>,
}

impl From<ParsedDocument> for FileEntry {
    fn from(parsed: ParsedDocument) -> Self {
        Self {
            location: parsed.location,
            kind: parsed.kind,
            definitions: parsed.definitions,
        }
    }
}

/// One entry of the (non-deduplicated) definition list
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub origin: DocumentId,
    pub definition: SelectorDefinition,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebuildSummary {
    /// Documents parsed successfully
    pub documents: usize,
    /// Documents without an extractor
    pub skipped: usize,
    /// Raw definition count
    pub definitions: usize,
    /// Deduplicated definition count
    pub unique: usize,
    pub failures: Vec<ParseFailure>,
}

impl RebuildSummary {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchSummary {
    /// Definitions appended from the fresh parse
    pub appended: usize,
    /// Stale occurrences removed from the definition list
    pub removed: usize,
    /// Whether the document's kind feeds the reverse index
    pub reference_bearing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IndexStore {
    reference_kinds: BTreeSet<String>,
    files: HashMap<DocumentId, FileEntry>,
    snapshot: HashMap<DocumentId, FileEntry>,
    definitions: Vec<Occurrence>,
    unique: Vec<SelectorDefinition>,
    reverse: HashMap<String, BTreeSet<DocumentId>>,
}

impl IndexStore {
    /// Empty store. Occurrences in documents of `reference_kinds` populate
    /// the reverse index.
    pub fn new<I, S>(reference_kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reference_kinds: reference_kinds.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn set_reference_kinds<I, S>(&mut self, reference_kinds: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reference_kinds = reference_kinds.into_iter().map(Into::into).collect();
    }

    pub fn is_reference_bearing(&self, kind: &str) -> bool {
        self.reference_kinds.contains(kind)
    }

    /// Drop every derived structure
    pub fn clear(&mut self) {
        self.files.clear();
        self.snapshot.clear();
        self.definitions.clear();
        self.unique.clear();
        self.reverse.clear();
    }

    /// Replace the whole index with the results of a finished dispatch
    pub fn apply_rebuild(&mut self, report: DispatchReport) -> RebuildSummary {
        let DispatchReport {
            succeeded,
            failed,
            skipped,
        } = report;

        self.files.clear();
        self.definitions.clear();
        self.reverse.clear();

        for parsed in &succeeded {
            self.files
                .insert(parsed.location.clone(), FileEntry::from(parsed.clone()));
        }
        self.snapshot = self.files.clone();

        let documents = succeeded.len();
        for parsed in succeeded {
            let reference_bearing = self.is_reference_bearing(&parsed.kind);
            for definition in parsed.definitions {
                if reference_bearing {
                    self.reverse
                        .entry(definition.name().to_string())
                        .or_default()
                        .insert(parsed.location.clone());
                }
                self.definitions.push(Occurrence {
                    origin: parsed.location.clone(),
                    definition,
                });
            }
        }
        self.recompute_unique();

        debug!(
            "Rebuilt index: {} documents, {} definitions, {} unique, {} referenced names",
            documents,
            self.definitions.len(),
            self.unique.len(),
            self.reverse.len()
        );

        RebuildSummary {
            documents,
            skipped: skipped.len(),
            definitions: self.definitions.len(),
            unique: self.unique.len(),
            failures: failed,
        }
    }

    /// Fold a fresh parse of one document into the index
    ///
    /// A failed parse should be passed in with no definitions. Old
    /// occurrences of a reference-bearing document are only removed for
    /// names it is the sole referencer of; names shared with another
    /// document keep their stale entries until the next rebuild. Documents
    /// that are not reference-bearing only ever append.
    pub fn patch_one(&mut self, parsed: ParsedDocument) -> PatchSummary {
        let location = parsed.location.clone();
        let reference_bearing = self.is_reference_bearing(&parsed.kind);
        let entry = FileEntry::from(parsed);

        let appended = entry.definitions.len();
        self.definitions
            .extend(entry.definitions.iter().cloned().map(|definition| Occurrence {
                origin: location.clone(),
                definition,
            }));

        let mut removed = 0;
        if reference_bearing {
            let previous = self
                .snapshot
                .get(&location)
                .map(|snapshot| snapshot.definitions.clone())
                .unwrap_or_default();

            for definition in &previous {
                let name = definition.name();
                let sole_referencer = self.reverse.get(name).is_some_and(|files| files.len() == 1);
                if !sole_referencer {
                    continue;
                }
                // Old occurrences precede the ones appended above
                let position = self.definitions.iter().position(|occurrence| {
                    occurrence.origin == location && occurrence.definition == *definition
                });
                if let Some(position) = position {
                    self.definitions.remove(position);
                    self.reverse.remove(name);
                    removed += 1;
                }
            }

            for definition in &entry.definitions {
                self.reverse
                    .entry(definition.name().to_string())
                    .or_default()
                    .insert(location.clone());
            }
            self.snapshot.insert(location.clone(), entry.clone());
        }

        self.files.insert(location.clone(), entry);
        self.recompute_unique();

        debug!(
            "Patched {}: {} appended, {} removed",
            location, appended, removed
        );

        PatchSummary {
            appended,
            removed,
            reference_bearing,
        }
    }

    fn recompute_unique(&mut self) {
        let mut seen: HashSet<(SelectorKind, &str)> = HashSet::with_capacity(self.unique.len());
        self.unique = self
            .definitions
            .iter()
            .filter(|occurrence| seen.insert(occurrence.definition.identity()))
            .map(|occurrence| occurrence.definition.clone())
            .collect();
    }

    /// Deduplicated definitions, first-occurrence order
    pub fn unique_definitions(&self) -> &[SelectorDefinition] {
        &self.unique
    }

    /// Every occurrence across all documents, not deduplicated
    pub fn occurrences(&self) -> &[Occurrence] {
        &self.definitions
    }

    pub fn definitions(&self) -> impl Iterator<Item = &SelectorDefinition> {
        self.definitions.iter().map(|occurrence| &occurrence.definition)
    }

    /// Documents referencing `name` (sigil optional)
    pub fn references(&self, name: &str) -> Option<&BTreeSet<DocumentId>> {
        self.reverse.get(normalize_selector(name))
    }

    pub fn reverse_index(&self) -> &HashMap<String, BTreeSet<DocumentId>> {
        &self.reverse
    }

    pub fn file_entry(&self, location: &DocumentId) -> Option<&FileEntry> {
        self.files.get(location)
    }

    pub fn snapshot_entry(&self, location: &DocumentId) -> Option<&FileEntry> {
        self.snapshot.get(location)
    }

    /// Locations with a current file entry, in no particular order
    pub fn documents(&self) -> impl Iterator<Item = &DocumentId> {
        self.files.keys()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.definitions.is_empty()
    }
}

impl SelectorLookup for IndexStore {
    fn unique_definitions(&self) -> Vec<SelectorDefinition> {
        self.unique.clone()
    }

    fn referencing_files(&self, name: &str) -> BTreeSet<DocumentId> {
        self.references(name).cloned().unwrap_or_default()
    }
}
