// Base Selector Types
//
// Data structures shared by every extractor and by the index:
// selector definitions, their kinds, and document identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Selector kinds - class (`.name`) or id (`#name`)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    Class,
    Id,
}

impl SelectorKind {
    /// The sigil that introduces this kind in stylesheet syntax
    pub fn sigil(&self) -> char {
        match self {
            SelectorKind::Class => '.',
            SelectorKind::Id => '#',
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorKind::Class => write!(f, "class"),
            SelectorKind::Id => write!(f, "id"),
        }
    }
}

/// One selector occurrence produced by an extractor.
///
/// `text` is stored exactly as extracted (usually with its sigil) and is what
/// gets displayed. Comparison and indexing go through [`name`](Self::name),
/// which has one leading sigil stripped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SelectorDefinition {
    pub kind: SelectorKind,
    pub text: String,
}

impl SelectorDefinition {
    /// Build a definition from raw extracted text, inferring the kind from
    /// the sigil. Text without a `#` sigil is a class.
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into();
        let kind = if text.starts_with('#') {
            SelectorKind::Id
        } else {
            SelectorKind::Class
        };
        Self { kind, text }
    }

    /// `.name` definition
    pub fn class(name: &str) -> Self {
        Self {
            kind: SelectorKind::Class,
            text: format!(".{}", name),
        }
    }

    /// `#name` definition
    pub fn id(name: &str) -> Self {
        Self {
            kind: SelectorKind::Id,
            text: format!("#{}", name),
        }
    }

    /// Normalized name used as the dictionary key everywhere in the index
    pub fn name(&self) -> &str {
        normalize_selector(&self.text)
    }

    /// Deduplication identity: (kind, normalized name)
    pub fn identity(&self) -> (SelectorKind, &str) {
        (self.kind, self.name())
    }

    /// Display form with the kind's sigil, e.g. `.btn` or `#header`
    pub fn display(&self) -> String {
        format!("{}{}", self.kind.sigil(), self.name())
    }
}

/// Strip one leading `.` or `#` sigil
pub fn normalize_selector(text: &str) -> &str {
    text.strip_prefix('.')
        .or_else(|| text.strip_prefix('#'))
        .unwrap_or(text)
}

/// Identifies one document in the workspace (a local filesystem path)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DocumentId(PathBuf);

impl DocumentId {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Lowercased file extension, if any
    pub fn extension(&self) -> Option<String> {
        self.0
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<PathBuf> for DocumentId {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&Path> for DocumentId {
    fn from(path: &Path) -> Self {
        Self(path.to_path_buf())
    }
}

impl From<&str> for DocumentId {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}

impl AsRef<Path> for DocumentId {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_infers_kind_from_sigil() {
        assert_eq!(SelectorDefinition::parse(".btn").kind, SelectorKind::Class);
        assert_eq!(SelectorDefinition::parse("#main").kind, SelectorKind::Id);
        assert_eq!(SelectorDefinition::parse("bare").kind, SelectorKind::Class);
    }

    #[test]
    fn test_name_strips_only_one_leading_sigil() {
        assert_eq!(SelectorDefinition::parse(".btn").name(), "btn");
        assert_eq!(SelectorDefinition::parse("#main").name(), "main");
        assert_eq!(SelectorDefinition::parse("..odd").name(), ".odd");
        assert_eq!(SelectorDefinition::parse("bare").name(), "bare");
    }

    #[test]
    fn test_class_and_id_with_same_name_have_distinct_identity() {
        let class = SelectorDefinition::class("foo");
        let id = SelectorDefinition::id("foo");
        assert_eq!(class.name(), id.name());
        assert_ne!(class.identity(), id.identity());
    }

    #[test]
    fn test_display_keeps_sigil() {
        assert_eq!(SelectorDefinition::parse("bare").display(), ".bare");
        assert_eq!(SelectorDefinition::id("x").display(), "#x");
    }

    #[test]
    fn test_document_extension_is_lowercased() {
        assert_eq!(
            DocumentId::from("views/Index.HTML").extension().as_deref(),
            Some("html")
        );
        assert_eq!(DocumentId::from("Makefile").extension(), None);
    }
}
