//! Incremental selector index
//!
//! - [`ParseDispatcher`] turns document locations into parsed definitions
//!   with bounded concurrency
//! - [`IndexStore`] holds the derived structures (raw and deduplicated
//!   definitions, reverse index, per-file snapshot) and applies rebuilds and
//!   single-document patches
//! - [`SelectorLookup`] is the read contract completion is built on

pub mod dispatcher;
pub mod store;

pub use dispatcher::{
    DispatchOutcome, DispatchProgress, DispatchReport, DocumentParse, ParseDispatcher,
    ParseFailure, ParsedDocument,
};
pub use store::{FileEntry, IndexStore, Occurrence, PatchSummary, RebuildSummary};

use crate::extractors::{DocumentId, SelectorDefinition};
use std::collections::BTreeSet;

/// Read access to an index
pub trait SelectorLookup {
    /// Deduplicated definitions in first-occurrence order
    fn unique_definitions(&self) -> Vec<SelectorDefinition>;

    /// Documents referencing `name`; the sigil is optional. Empty when none do.
    fn referencing_files(&self, name: &str) -> BTreeSet<DocumentId>;
}
