use crate::extractors::base::{SelectorDefinition, SelectorKind};
use once_cell::sync::Lazy;
use regex::Regex;

static CLASS_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:class|classname)="([^"]+)""#).expect("valid class attribute regex")
});

static ID_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bid="([^"]+)""#).expect("valid id attribute regex"));

/// Attribute scanning shared by markup-like dialects
pub(crate) struct AttributeScanner;

impl AttributeScanner {
    /// Raw values of every `class="…"` / `className="…"` attribute
    pub(crate) fn class_values(text: &str) -> Vec<&str> {
        Self::values(&CLASS_ATTR_RE, text)
    }

    /// Raw values of every `id="…"` attribute
    pub(crate) fn id_values(text: &str) -> Vec<&str> {
        Self::values(&ID_ATTR_RE, text)
    }

    /// Classes first, then ids, each attribute value split on whitespace
    pub(crate) fn definitions(text: &str) -> Vec<SelectorDefinition> {
        let mut definitions = Self::split(SelectorKind::Class, Self::class_values(text));
        definitions.extend(Self::split(SelectorKind::Id, Self::id_values(text)));
        definitions
    }

    fn values<'t>(re: &Regex, text: &'t str) -> Vec<&'t str> {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .collect()
    }

    fn split(kind: SelectorKind, values: Vec<&str>) -> Vec<SelectorDefinition> {
        values
            .into_iter()
            .flat_map(|value| value.split_whitespace())
            .map(|word| match kind {
                SelectorKind::Class => SelectorDefinition::class(word),
                SelectorKind::Id => SelectorDefinition::id(word),
            })
            .collect()
    }
}
