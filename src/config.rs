//! Index configuration.
//!
//! Loads/saves a JSON config at `<workspace>/.selector-index.json`. Every
//! field has a default so partial files are fine.

use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the per-workspace configuration
pub const CONFIG_FILE_NAME: &str = ".selector-index.json";

/// Default bound on concurrent document parses
pub const DEFAULT_CONCURRENCY: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Workspace-relative globs of documents to index
    pub include: Vec<String>,
    /// Workspace-relative globs excluded even when included
    pub exclude: Vec<String>,
    /// Kinds whose selector occurrences count as usages in the reverse index
    pub reference_kinds: Vec<String>,
    /// Also treat scss documents as reference-bearing
    pub enable_scss_find_usage: bool,
    /// Kinds whose save events patch the index
    pub save_trigger_kinds: Vec<String>,
    /// Maximum documents parsed at once during a rebuild
    pub concurrency: usize,
    /// Skip files matched by `.gitignore` during discovery
    pub respect_gitignore: bool,
    /// Stylesheet URLs fetched into the remote cache on every rebuild
    pub remote_stylesheets: Vec<String>,
    /// Globs of documents scanned for `<link rel="stylesheet">` URLs
    pub remote_link_globs: Vec<String>,
    /// Where fetched stylesheets are stored (defaults under the temp dir)
    pub remote_cache_dir: Option<PathBuf>,
    /// Per-request timeout for remote stylesheets
    pub fetch_timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            include: [
                "css", "scss", "html", "htm", "php", "twig", "latte", "slim", "tpl", "svelte",
                "vue", "tsx", "jsx",
            ]
            .iter()
            .map(|ext| format!("**/*.{}", ext))
            .collect(),
            exclude: vec!["**/node_modules/**".to_string()],
            reference_kinds: strings(&["html", "latte", "twig", "slim", "php"]),
            enable_scss_find_usage: false,
            save_trigger_kinds: strings(&["html", "xhtml", "twig", "latte", "slim", "css", "scss"]),
            concurrency: DEFAULT_CONCURRENCY,
            respect_gitignore: true,
            remote_stylesheets: Vec::new(),
            remote_link_globs: Vec::new(),
            remote_cache_dir: None,
            fetch_timeout_secs: 10,
        }
    }
}

impl IndexConfig {
    /// Load configuration from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| IndexError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config.validated())
    }

    /// Save configuration to the given path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load the workspace config file, or defaults if there is none.
    /// A file that exists but does not parse is still an error.
    pub fn load_for_workspace(workspace_root: &Path) -> Result<Self> {
        let path = Self::workspace_path(workspace_root);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn workspace_path(workspace_root: &Path) -> PathBuf {
        workspace_root.join(CONFIG_FILE_NAME)
    }

    /// Whether occurrences in documents of `kind` count as references
    pub fn is_reference_bearing(&self, kind: &str) -> bool {
        (self.enable_scss_find_usage && kind == "scss")
            || self.reference_kinds.iter().any(|k| k == kind)
    }

    /// Every reference-bearing kind, with the scss flag applied
    pub fn reference_bearing_kinds(&self) -> BTreeSet<String> {
        let mut kinds: BTreeSet<String> = self.reference_kinds.iter().cloned().collect();
        if self.enable_scss_find_usage {
            kinds.insert("scss".to_string());
        }
        kinds
    }

    /// Whether a save of a document of `kind` should patch the index
    pub fn triggers_on_save(&self, kind: &str) -> bool {
        self.save_trigger_kinds.iter().any(|k| k == kind)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn remote_cache_dir(&self) -> PathBuf {
        self.remote_cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("selector_index_remote"))
    }

    fn validated(mut self) -> Self {
        if self.concurrency == 0 {
            tracing::warn!("concurrency of 0 is not allowed, using 1");
            self.concurrency = 1;
        }
        self
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
