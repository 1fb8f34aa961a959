// Markup Extractor
//
// Extracts class/id references from HTML and template dialects (php, twig,
// latte, smarty, eex, svelte, vue, jsx/tsx, ...) by scanning attributes.

pub(crate) mod attributes;

use crate::extractors::base::{Extractor, SelectorDefinition};
use attributes::AttributeScanner;
use tracing::debug;

/// Pattern-based extractor for tag-attribute dialects
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkupExtractor;

impl MarkupExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for MarkupExtractor {
    fn name(&self) -> &str {
        "markup"
    }

    fn extract(&self, text: &str) -> Vec<SelectorDefinition> {
        let definitions = AttributeScanner::definitions(text);
        debug!("Extracted {} markup selectors", definitions.len());
        definitions
    }
}
