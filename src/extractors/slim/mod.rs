// Slim Extractor
//
// Slim templates declare selectors through tag shorthand at the start of a
// line (`div.card.wide#main`, `.note`, `#footer`) as well as through regular
// `class="…"` / `id="…"` attributes.

use crate::extractors::base::{Extractor, SelectorDefinition};
use crate::extractors::css::helpers::strip_comments;
use crate::extractors::html::attributes::AttributeScanner;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Optional tag name followed by one or more `.x` / `#y` segments
static SHORTHAND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[a-zA-Z][\w:-]*)?((?:[.#][_a-zA-Z-][\w-]*)+)")
        .expect("valid slim shorthand regex")
});

static SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.#][_a-zA-Z-][\w-]*").expect("valid slim segment regex"));

#[derive(Debug, Default, Clone, Copy)]
pub struct SlimExtractor;

impl SlimExtractor {
    pub fn new() -> Self {
        Self
    }

    fn shorthand(code: &str) -> Vec<SelectorDefinition> {
        SHORTHAND_RE
            .captures_iter(code)
            .filter_map(|caps| caps.get(1))
            .flat_map(|chain| SEGMENT_RE.find_iter(chain.as_str()))
            .map(|segment| SelectorDefinition::parse(segment.as_str()))
            .collect()
    }
}

impl Extractor for SlimExtractor {
    fn name(&self) -> &str {
        "slim"
    }

    fn extract(&self, text: &str) -> Vec<SelectorDefinition> {
        let code = strip_comments(text);
        let mut definitions = Self::shorthand(&code);
        definitions.extend(AttributeScanner::definitions(&code));
        debug!("Extracted {} slim selectors", definitions.len());
        definitions
    }
}
