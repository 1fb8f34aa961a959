//! Document kinds - shared extension → kind configuration
//!
//! A document kind is the string tag the extractor registry is keyed by.
//! Known extensions map to a canonical kind (`htm` → `html`, `tpl` →
//! `smarty`); any other extension is its own kind, so callers can register
//! extractors for dialects this crate does not know about.

use std::path::Path;

/// Canonical kind for a known file extension (lowercase input expected)
pub fn detect_kind_from_extension(extension: &str) -> Option<&'static str> {
    match extension {
        // Stylesheets
        "css" => Some("css"),
        "scss" => Some("scss"),

        // Markup
        "html" | "htm" => Some("html"),
        "xhtml" => Some("xhtml"),
        "php" | "phtml" => Some("php"),
        "vue" => Some("vue"),
        "svelte" => Some("svelte"),
        "razor" | "cshtml" => Some("razor"),

        // Templates
        "twig" => Some("twig"),
        "latte" => Some("latte"),
        "tpl" => Some("smarty"),
        "slim" => Some("slim"),
        "eex" => Some("eex"),
        "heex" => Some("heex"),
        "erb" => Some("erb"),
        "hbs" | "handlebars" => Some("handlebars"),
        "ejs" => Some("ejs"),

        // JavaScript with markup
        "tsx" => Some("tsx"),
        "jsx" => Some("jsx"),

        _ => None,
    }
}

/// Kind for a path: the canonical kind of its extension, or the lowercased
/// extension itself. `None` only for paths without an extension.
pub fn kind_for_path(path: &Path) -> Option<String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())?
        .to_ascii_lowercase();

    // `index.blade.php` is a blade template, not plain php
    if extension == "php" {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if stem.to_ascii_lowercase().ends_with(".blade") {
                return Some("blade".to_string());
            }
        }
    }

    Some(
        detect_kind_from_extension(&extension)
            .map(str::to_string)
            .unwrap_or(extension),
    )
}
