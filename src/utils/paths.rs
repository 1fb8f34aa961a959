// Path conversion utilities
//
// Converts between absolute native paths and workspace-relative Unix-style
// paths. Glob patterns and completion documentation both work on the
// relative form.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// Convert an absolute path to a workspace-relative path with `/` separators
///
/// Fails if the path is not inside `workspace_root`.
///
/// ```text
/// to_relative_unix_style("/home/dev/site/views/index.html", "/home/dev/site")
/// // => "views/index.html"
/// ```
pub fn to_relative_unix_style(absolute: &Path, workspace_root: &Path) -> Result<String> {
    // Lexical match first: the walker hands us paths built from the root,
    // and canonicalizing every one of them is wasted syscalls
    let relative = match absolute.strip_prefix(workspace_root) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => {
            // Symlinked roots (/var -> /private/var on macOS) only line up
            // once both sides are canonical
            let (path, root) = match (absolute.canonicalize(), workspace_root.canonicalize()) {
                (Ok(path), Ok(root)) => (path, root),
                _ => (absolute.to_path_buf(), workspace_root.to_path_buf()),
            };
            path.strip_prefix(&root)
                .with_context(|| {
                    format!(
                        "File path '{}' is not within workspace root '{}'",
                        path.display(),
                        root.display()
                    )
                })?
                .to_path_buf()
        }
    };

    let path_str = relative.to_str().context("Path contains invalid UTF-8")?;

    // No-op on Unix
    let unix_style = if MAIN_SEPARATOR == '\\' {
        path_str.replace('\\', "/")
    } else {
        path_str.to_string()
    };

    Ok(unix_style)
}

/// Join a relative Unix-style path onto the workspace root
pub fn to_absolute_native(relative_unix: &str, workspace_root: &Path) -> PathBuf {
    workspace_root.join(relative_unix)
}

/// Relative form when possible, the full path otherwise
pub fn display_relative(path: &Path, workspace_root: &Path) -> String {
    to_relative_unix_style(path, workspace_root)
        .unwrap_or_else(|_| path.to_string_lossy().replace('\\', "/"))
}
