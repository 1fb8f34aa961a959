//! Selector Extractors Module
//!
//! Pattern-based extractors that turn document text into an ordered list of
//! class/id selector definitions. Each dialect family is one [`Extractor`]
//! variant; the [`ExtractorRegistry`] maps document kinds to them.
//!
//! # Architecture
//!
//! - `base` - SelectorDefinition, DocumentId and the Extractor trait
//! - `registry` - kind tag → extractor mapping
//! - `css` - stylesheets (css, scss)
//! - `html` - tag-attribute dialects (html, php, twig, latte, jsx, ...)
//! - `slim` - slim templates (shorthand + attributes)

pub mod base;
pub mod css;
pub mod html;
pub mod registry;
pub mod slim;

// Re-export the public API
pub use base::{
    normalize_selector, DocumentId, Extractor, FnExtractor, SelectorDefinition, SelectorKind,
};
pub use css::StylesheetExtractor;
pub use html::MarkupExtractor;
pub use registry::ExtractorRegistry;
pub use slim::SlimExtractor;
