// Stylesheet helpers - comment stripping and color filtering

use once_cell::sync::Lazy;
use regex::Regex;

/// Block comments, plus `//` line comments not preceded by `:` (keeps `http://`)
static COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)/\*[\s\S]*?\*/|([^:]|^)//.*$").expect("valid comment regex"));

/// `#abc`, `#a1b2c3` and friends - colors, not id selectors
static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#+\b[0-9A-Fa-f]{3,6}\b").expect("valid hex color regex"));

/// Remove comments from stylesheet-like text.
///
/// The character preceding a `//` comment is consumed along with it, which
/// never matters for selector extraction since it only drops a separator.
pub(crate) fn strip_comments(text: &str) -> String {
    COMMENT_RE.replace_all(text, "").into_owned()
}

/// Check whether an extracted `#token` is really a hex color
pub(crate) fn looks_like_hex_color(token: &str) -> bool {
    HEX_COLOR_RE.is_match(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_block_comments() {
        let stripped = strip_comments("/* .hidden */ .shown {}");
        assert!(!stripped.contains("hidden"));
        assert!(stripped.contains(".shown"));
    }

    #[test]
    fn test_strip_multiline_block_comment() {
        let stripped = strip_comments(".a {}\n/*\n.b {}\n*/\n.c {}");
        assert!(stripped.contains(".a"));
        assert!(!stripped.contains(".b"));
        assert!(stripped.contains(".c"));
    }

    #[test]
    fn test_line_comment_keeps_urls() {
        let stripped = strip_comments("@import url(http://cdn.example/x.css);\n// .gone\n.kept {}");
        assert!(stripped.contains("http://cdn.example"));
        assert!(!stripped.contains("gone"));
        assert!(stripped.contains(".kept"));
    }

    #[test]
    fn test_hex_colors_detected() {
        assert!(looks_like_hex_color("#fff"));
        assert!(looks_like_hex_color("#A1B2C3"));
        assert!(!looks_like_hex_color("#header"));
        assert!(!looks_like_hex_color(".fff"));
    }
}
