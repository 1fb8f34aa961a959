use super::remote::{extract_stylesheet_links, RemoteStylesheets};
use super::{read_document, DocumentSource};
use crate::config::IndexConfig;
use crate::error::Result as IndexResult;
use crate::extractors::DocumentId;
use crate::utils::paths::to_relative_unix_style;
use crate::utils::PatternSet;
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Documents under a workspace root, filtered by include/exclude globs
///
/// Remote stylesheets configured for the workspace are fetched during
/// [`DocumentSource::list_all`] and listed after the local documents.
#[derive(Debug)]
pub struct WorkspaceSource {
    root: PathBuf,
    include: PatternSet,
    exclude: PatternSet,
    respect_gitignore: bool,
    link_globs: PatternSet,
    configured_urls: Vec<String>,
    remote: Option<RemoteStylesheets>,
}

impl WorkspaceSource {
    /// Source with the default configuration
    pub fn new(root: impl Into<PathBuf>) -> IndexResult<Self> {
        Self::from_config(root, &IndexConfig::default())
    }

    pub fn from_config(root: impl Into<PathBuf>, config: &IndexConfig) -> IndexResult<Self> {
        let link_globs = PatternSet::compile(&config.remote_link_globs)?;
        let remote = if config.remote_stylesheets.is_empty() && link_globs.is_empty() {
            None
        } else {
            Some(RemoteStylesheets::new(
                config.remote_cache_dir(),
                config.fetch_timeout(),
            )?)
        };

        Ok(Self {
            root: root.into(),
            include: PatternSet::compile(&config.include)?,
            exclude: PatternSet::compile(&config.exclude)?,
            respect_gitignore: config.respect_gitignore,
            link_globs,
            configured_urls: config.remote_stylesheets.clone(),
            remote,
        })
    }

    /// Share a cancellation flag with the remote fetcher
    pub fn with_cancellation(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.remote = self
            .remote
            .map(|remote| remote.with_cancellation(cancelled));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a path inside the workspace passes the include/exclude globs
    pub fn is_included(&self, path: &Path) -> bool {
        match to_relative_unix_style(path, &self.root) {
            Ok(relative) => self.include.matches(&relative) && !self.exclude.matches(&relative),
            Err(_) => false,
        }
    }

    fn walk_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .git_global(false)
            .require_git(false)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable path during discovery: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_some_and(|ty| ty.is_file()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Configured URLs plus stylesheet links found in link-glob documents,
    /// deduplicated in first-seen order
    fn remote_urls(&self, files: &[PathBuf]) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut urls = Vec::new();
        let mut push = |url: String| {
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        };

        self.configured_urls.iter().cloned().for_each(&mut push);

        if !self.link_globs.is_empty() {
            for path in files {
                let Ok(relative) = to_relative_unix_style(path, &self.root) else {
                    continue;
                };
                if !self.link_globs.matches(&relative) {
                    continue;
                }
                match read_document(&DocumentId::new(path)) {
                    Ok(text) => extract_stylesheet_links(&text).into_iter().for_each(&mut push),
                    Err(e) => warn!("Could not scan {} for stylesheet links: {:#}", relative, e),
                }
            }
        }
        urls
    }
}

impl DocumentSource for WorkspaceSource {
    fn accepts(&self, id: &DocumentId) -> bool {
        self.is_included(id.path())
    }

    fn list_all(&self) -> Result<Vec<DocumentId>> {
        if !self.root.is_dir() {
            anyhow::bail!("Workspace root {} is not a directory", self.root.display());
        }

        let files = self
            .walk_files()
            .with_context(|| format!("Failed to walk workspace {}", self.root.display()))?;

        let mut documents: Vec<DocumentId> = files
            .iter()
            .filter(|path| self.is_included(path))
            .map(DocumentId::new)
            .collect();
        documents.sort();
        debug!(
            "Discovered {} of {} files under {}",
            documents.len(),
            files.len(),
            self.root.display()
        );

        if let Some(remote) = &self.remote {
            let urls = self.remote_urls(&files);
            let cached = remote
                .fetch_all(&urls)
                .with_context(|| format!("Failed to prepare {}", remote.cache_dir().display()))?;
            if !cached.is_empty() {
                info!("Including {} remote stylesheets", cached.len());
            }
            documents.extend(cached);
        }

        Ok(documents)
    }
}
