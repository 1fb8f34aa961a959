// Base Extractor Types and Traits
//
// - types.rs: SelectorDefinition, SelectorKind, DocumentId
// - extractor.rs: the Extractor capability trait and closure adapter

pub mod extractor;
pub mod types;

// Re-export key types for external use
pub use extractor::{Extractor, FnExtractor};
pub use types::{normalize_selector, DocumentId, SelectorDefinition, SelectorKind};
