//! Completion projection
//!
//! Turns the index into completion candidates for a cursor position. The
//! caller supplies the text of the current line up to the cursor and the
//! document's dialect; [`AttributeContext::detect`] decides whether that is
//! a selector position, and [`CompletionProjector::project`] reads the index
//! through [`SelectorLookup`].

use crate::extractors::{SelectorDefinition, SelectorKind};
use crate::index::SelectorLookup;
use crate::utils::paths::display_relative;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

static CLASS_ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:class|classname)\s*=\s*["']([^"']*)$"#).expect("class attribute regex")
});
static ID_ATTRIBUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bid\s*=\s*["']([^"']*)$"#).expect("id attribute regex"));
static SCRIPT_ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(?:class|className|id)=["']([\w\- ]*)$"#).expect("script attribute regex")
});
static APPLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@apply\s+([.\w\- ]*)$").expect("@apply regex"));
static SIGIL_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.#])([\w-]*)$").expect("sigil token regex"));
static SLIM_SHORTHAND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.#][\w.#-]*)$").expect("slim shorthand regex"));

/// How a document spells selectors, for context detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `class="…"` and `id="…"` attributes
    Markup,
    /// JSX/TSX: one attribute rule for `class`, `className` and `id`
    Script,
    /// Markup attributes plus `div.card#main` shorthand
    Slim,
    /// `.name`, `#name` and `@apply` lists
    Stylesheet,
}

impl Dialect {
    /// Dialect for a document kind, `None` for kinds without completion
    pub fn for_kind(kind: &str) -> Option<Self> {
        match kind {
            "css" | "scss" | "sass" | "less" => Some(Dialect::Stylesheet),
            "tsx" | "jsx" | "javascript" => Some(Dialect::Script),
            "slim" => Some(Dialect::Slim),
            "html" | "xhtml" | "php" | "latte" | "twig" | "smarty" | "eex" | "heex" | "svelte"
            | "vue" | "erb" | "handlebars" | "ejs" | "blade" | "razor" | "markdown" => {
                Some(Dialect::Markup)
            }
            _ => None,
        }
    }
}

/// A detected selector position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeContext {
    /// Only candidates of this kind apply; `None` offers both
    pub kind: Option<SelectorKind>,
    /// Sigil prepended to the insert text
    pub prefix: Option<char>,
    /// Names already written in the attribute or token list
    pub present: Vec<String>,
}

impl AttributeContext {
    /// Inspect the line text before the cursor. `None` when the cursor is not
    /// at a selector position.
    pub fn detect(line_prefix: &str, dialect: Dialect) -> Option<Self> {
        match dialect {
            Dialect::Markup => markup_context(line_prefix),
            Dialect::Script => SCRIPT_ATTRIBUTE_RE
                .captures(line_prefix)
                .map(|caps| Self::new(None, None, words(&caps[1]))),
            Dialect::Slim => markup_context(line_prefix).or_else(|| slim_context(line_prefix)),
            Dialect::Stylesheet => stylesheet_context(line_prefix),
        }
    }

    fn new(kind: Option<SelectorKind>, prefix: Option<char>, present: Vec<String>) -> Self {
        Self {
            kind,
            prefix,
            present,
        }
    }

    fn accepts(&self, definition: &SelectorDefinition) -> bool {
        self.kind.map_or(true, |kind| kind == definition.kind)
    }
}

fn markup_context(line_prefix: &str) -> Option<AttributeContext> {
    if let Some(caps) = CLASS_ATTRIBUTE_RE.captures(line_prefix) {
        return Some(AttributeContext::new(
            Some(SelectorKind::Class),
            None,
            words(&caps[1]),
        ));
    }
    ID_ATTRIBUTE_RE
        .captures(line_prefix)
        .map(|caps| AttributeContext::new(Some(SelectorKind::Id), None, words(&caps[1])))
}

fn slim_context(line_prefix: &str) -> Option<AttributeContext> {
    // Inside quotes, parentheses or interpolation the shorthand does not apply
    if line_prefix.contains(['"', '(', '{']) {
        return None;
    }
    let caps = SLIM_SHORTHAND_RE.captures(line_prefix)?;
    let present = caps[1]
        .split(['.', '#'])
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();
    Some(AttributeContext::new(None, None, present))
}

fn stylesheet_context(line_prefix: &str) -> Option<AttributeContext> {
    if let Some(caps) = APPLY_RE.captures(line_prefix) {
        let present = caps[1]
            .split_whitespace()
            .map(|word| word.trim_start_matches('.').to_string())
            .filter(|word| !word.is_empty())
            .collect();
        return Some(AttributeContext::new(Some(SelectorKind::Class), None, present));
    }

    let caps = SIGIL_TOKEN_RE.captures(line_prefix)?;
    let sigil = caps[1].chars().next()?;
    let kind = if sigil == '#' {
        SelectorKind::Id
    } else {
        SelectorKind::Class
    };
    Some(AttributeContext::new(Some(kind), Some(sigil), Vec::new()))
}

fn words(attribute_value: &str) -> Vec<String> {
    attribute_value
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// One completion suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionCandidate {
    /// Normalized name
    pub label: String,
    pub insert_text: String,
    pub kind: SelectorKind,
    /// Plain-text list of referencing files, when there are any
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionProjector {
    workspace_root: Option<PathBuf>,
}

impl CompletionProjector {
    /// Projector that lists referencing files relative to `workspace_root`
    pub fn new(workspace_root: Option<PathBuf>) -> Self {
        Self { workspace_root }
    }

    pub fn project(
        &self,
        lookup: &dyn SelectorLookup,
        context: &AttributeContext,
    ) -> Vec<CompletionCandidate> {
        let present: HashSet<&str> = context.present.iter().map(String::as_str).collect();

        lookup
            .unique_definitions()
            .into_iter()
            .filter(|definition| context.accepts(definition))
            .filter(|definition| !present.contains(definition.name()))
            .map(|definition| self.candidate(lookup, context, &definition))
            .collect()
    }

    fn candidate(
        &self,
        lookup: &dyn SelectorLookup,
        context: &AttributeContext,
        definition: &SelectorDefinition,
    ) -> CompletionCandidate {
        let name = definition.name();
        let insert_text = match context.prefix {
            Some(sigil) => format!("{}{}", sigil, name),
            None => name.to_string(),
        };

        let files = lookup.referencing_files(name);
        let documentation = if files.is_empty() {
            None
        } else {
            let mut doc = format!(
                "{}\n\n{} occurrences in files:\n",
                definition.display(),
                files.len()
            );
            for file in &files {
                let shown = match &self.workspace_root {
                    Some(root) => display_relative(file.path(), root),
                    None => file.to_string(),
                };
                doc.push('\n');
                doc.push_str(&shown);
            }
            Some(doc)
        };

        CompletionCandidate {
            label: name.to_string(),
            insert_text,
            kind: definition.kind,
            documentation,
        }
    }
}
