// Stylesheet Extractor
//
// Extracts class and id selectors from CSS and SCSS text:
// - Comments are stripped first
// - Every `.name` / `#name` token becomes a definition, in source order
// - Hex colors (`#fff`) are skipped

pub(crate) mod helpers;

use crate::extractors::base::{Extractor, SelectorDefinition};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static SELECTOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[.#]-?[_a-zA-Z]+[_a-zA-Z0-9-]*").expect("valid stylesheet selector regex")
});

/// Pattern-based selector extractor for `css` and `scss` documents
#[derive(Debug, Default, Clone, Copy)]
pub struct StylesheetExtractor;

impl StylesheetExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for StylesheetExtractor {
    fn name(&self) -> &str {
        "stylesheet"
    }

    fn extract(&self, text: &str) -> Vec<SelectorDefinition> {
        let code = helpers::strip_comments(text);

        let definitions: Vec<SelectorDefinition> = SELECTOR_RE
            .find_iter(&code)
            .map(|m| m.as_str())
            .filter(|token| !helpers::looks_like_hex_color(token))
            .map(SelectorDefinition::parse)
            .collect();

        debug!("Extracted {} stylesheet selectors", definitions.len());
        definitions
    }
}
