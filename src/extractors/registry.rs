//! ExtractorRegistry - maps document kinds to extractors
//!
//! The dispatcher never knows about individual dialects: it asks the registry
//! for the extractor registered under a document's kind tag and skips the
//! document when there is none.

use crate::extractors::base::Extractor;
use crate::extractors::css::StylesheetExtractor;
use crate::extractors::html::MarkupExtractor;
use crate::extractors::slim::SlimExtractor;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Kinds handled by [`StylesheetExtractor`] in the default registry
pub const STYLESHEET_KINDS: &[&str] = &["css", "scss"];

/// Kinds handled by [`MarkupExtractor`] in the default registry
pub const MARKUP_KINDS: &[&str] = &[
    "html",
    "xhtml",
    "php",
    "latte",
    "twig",
    "smarty",
    "eex",
    "heex",
    "svelte",
    "vue",
    "tsx",
    "jsx",
    "erb",
    "handlebars",
    "ejs",
    "blade",
    "razor",
];

/// Kinds handled by [`SlimExtractor`] in the default registry
pub const SLIM_KINDS: &[&str] = &["slim"];

#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Empty registry - every document is skipped until something is registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in stylesheet, markup and slim extractors
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        let stylesheet: Arc<dyn Extractor> = Arc::new(StylesheetExtractor::new());
        for kind in STYLESHEET_KINDS {
            registry.register_shared(*kind, Arc::clone(&stylesheet));
        }

        let markup: Arc<dyn Extractor> = Arc::new(MarkupExtractor::new());
        for kind in MARKUP_KINDS {
            registry.register_shared(*kind, Arc::clone(&markup));
        }

        let slim: Arc<dyn Extractor> = Arc::new(SlimExtractor::new());
        for kind in SLIM_KINDS {
            registry.register_shared(*kind, Arc::clone(&slim));
        }

        registry
    }

    /// Register (or replace) the extractor for a document kind
    pub fn register<E>(&mut self, kind: impl Into<String>, extractor: E)
    where
        E: Extractor + 'static,
    {
        self.register_shared(kind, Arc::new(extractor));
    }

    /// Register an already shared extractor, so several kinds can point at one instance
    pub fn register_shared(&mut self, kind: impl Into<String>, extractor: Arc<dyn Extractor>) {
        let kind = kind.into();
        if let Some(previous) = self.extractors.insert(kind.clone(), extractor) {
            tracing::debug!(
                "Replaced '{}' extractor for document kind '{}'",
                previous.name(),
                kind
            );
        }
    }

    /// Extractor registered for `kind`, if any
    pub fn resolve(&self, kind: &str) -> Option<Arc<dyn Extractor>> {
        self.extractors.get(kind).cloned()
    }

    pub fn supports(&self, kind: &str) -> bool {
        self.extractors.contains_key(kind)
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.extractors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
