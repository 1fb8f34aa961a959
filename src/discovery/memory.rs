use super::DocumentSource;
use crate::extractors::DocumentId;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

/// Documents held in memory (unsaved editor buffers, fixtures)
#[derive(Debug, Default)]
pub struct InMemorySource {
    documents: RwLock<HashMap<DocumentId, String>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source from `(path, text)` pairs
    pub fn with_documents<P, T>(documents: impl IntoIterator<Item = (P, T)>) -> Self
    where
        P: Into<PathBuf>,
        T: Into<String>,
    {
        let source = Self::new();
        for (path, text) in documents {
            source.insert(path, text);
        }
        source
    }

    /// Add or replace a document
    pub fn insert(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(DocumentId::new(path), text.into());
    }

    pub fn remove(&self, id: &DocumentId) -> Option<String> {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentSource for InMemorySource {
    /// Sorted by path
    fn list_all(&self) -> Result<Vec<DocumentId>> {
        let mut ids: Vec<DocumentId> = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn read_text(&self, id: &DocumentId) -> Result<String> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("Document not found: {}", id))
    }
}
