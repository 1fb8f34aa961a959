//! Document discovery
//!
//! A [`DocumentSource`] tells the index which documents exist, what kind
//! each one is, and how to read its text. Two sources ship with the crate:
//! [`WorkspaceSource`] walks a directory tree (and pulls remote stylesheets
//! into a local cache), [`InMemorySource`] serves text held in memory.

mod memory;
pub mod remote;
mod workspace;

pub use memory::InMemorySource;
pub use remote::RemoteStylesheets;
pub use workspace::WorkspaceSource;

use crate::extractors::DocumentId;
use crate::language::kind_for_path;
use anyhow::{Context, Result};

pub trait DocumentSource: Send + Sync {
    /// Every document that should be indexed, in a stable order
    fn list_all(&self) -> Result<Vec<DocumentId>>;

    /// Kind tag of a document (derived from its extension by default)
    fn document_kind(&self, id: &DocumentId) -> Option<String> {
        kind_for_path(id.path())
    }

    /// Whether a document belongs to this source's selection. Saves of
    /// documents it rejects are not indexed.
    fn accepts(&self, _id: &DocumentId) -> bool {
        true
    }

    /// Current text of a document
    fn read_text(&self, id: &DocumentId) -> Result<String> {
        read_document(id)
    }
}

/// Read a document from disk. Invalid UTF-8 is replaced rather than rejected.
pub fn read_document(id: &DocumentId) -> Result<String> {
    let bytes =
        std::fs::read(id.path()).with_context(|| format!("Failed to read document {}", id))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
