//! Include/exclude glob sets
//!
//! Patterns are matched against workspace-relative Unix-style paths
//! (`views/index.html`), so configuration is portable across platforms.

use crate::error::{IndexError, Result};
use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A compiled list of globs. A path matches when any pattern does.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn compile<S: AsRef<str>>(sources: &[S]) -> Result<Self> {
        let mut patterns = Vec::with_capacity(sources.len());
        for source in sources {
            for source in expand_braces(source.as_ref()) {
                patterns.push(compile_one(&source)?);

                // `**/` also covers the zero-directory case (`**/*.css` matches `site.css`)
                if let Some(rest) = source.strip_prefix("**/") {
                    if !rest.is_empty() {
                        patterns.push(compile_one(rest)?);
                    }
                }
            }
        }
        Ok(Self { patterns })
    }

    pub fn matches(&self, relative_unix: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(relative_unix, MATCH_OPTIONS))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn compile_one(source: &str) -> Result<Pattern> {
    Pattern::new(source).map_err(|e| IndexError::Pattern {
        pattern: source.to_string(),
        message: e.to_string(),
    })
}

/// Expand one level of `{a,b,c}` alternation, which `glob` does not support
///
/// `**/*.{css,scss}` becomes `**/*.css` and `**/*.scss`. Nested braces are
/// left for the glob compiler to reject.
pub fn expand_braces(source: &str) -> Vec<String> {
    let (Some(open), Some(close)) = (source.find('{'), source.find('}')) else {
        return vec![source.to_string()];
    };
    if close < open {
        return vec![source.to_string()];
    }

    let prefix = &source[..open];
    let suffix = &source[close + 1..];
    source[open + 1..close]
        .split(',')
        .flat_map(|alternative| expand_braces(&format!("{}{}{}", prefix, alternative, suffix)))
        .collect()
}
