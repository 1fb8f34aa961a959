// Extractor capability
//
// Every document dialect supplies one implementation. Extractors are pure:
// same text in, same ordered definitions out. They never fail; malformed
// input yields whatever partial result the patterns still find.

use super::types::SelectorDefinition;

/// Capability implemented by every per-dialect selector extractor
pub trait Extractor: Send + Sync {
    /// Short name used in logs (e.g. "stylesheet", "markup")
    fn name(&self) -> &str;

    /// Extract selector definitions from document text, in document order
    fn extract(&self, text: &str) -> Vec<SelectorDefinition>;
}

/// Closure-backed extractor, mostly for custom registrations and tests
pub struct FnExtractor<F> {
    name: String,
    func: F,
}

impl<F> FnExtractor<F>
where
    F: Fn(&str) -> Vec<SelectorDefinition> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Extractor for FnExtractor<F>
where
    F: Fn(&str) -> Vec<SelectorDefinition> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, text: &str) -> Vec<SelectorDefinition> {
        (self.func)(text)
    }
}
