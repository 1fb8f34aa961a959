//! Remote stylesheets
//!
//! Stylesheets linked from a CDN never appear in the workspace, yet their
//! selectors should still complete. Before each rebuild the configured URLs
//! (plus any `<link rel="stylesheet">` hrefs found in scanned markup) are
//! downloaded into a cache directory, and the cached copies are indexed as
//! ordinary `css` documents.
//!
//! Fetch failures are logged and skipped. A rebuild never fails because a CDN
//! is down.

use crate::error::{IndexError, Result};
use crate::extractors::DocumentId;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

static LINK_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<link\b[^>]*>").expect("link tag regex"));
static REL_STYLESHEET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\brel\s*=\s*["']?\s*stylesheet\b"#).expect("rel attribute regex")
});
static HREF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("href attribute regex")
});

/// Downloads stylesheets into a local cache directory
pub struct RemoteStylesheets {
    cache_dir: PathBuf,
    client: reqwest::blocking::Client,
    cancelled: Arc<AtomicBool>,
}

impl RemoteStylesheets {
    pub fn new(cache_dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexError::Fetch(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            cache_dir: cache_dir.into(),
            client,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Share a cancellation flag. Once set, no further downloads start.
    pub fn with_cancellation(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Empty the cache and download every URL into it. Returns the cached
    /// stylesheets in the directory, sorted by path.
    pub fn fetch_all(&self, urls: &[String]) -> Result<Vec<DocumentId>> {
        self.prepare_cache_dir()?;

        let mut fetched = 0usize;
        for url in urls {
            if self.cancelled.load(Ordering::Relaxed) {
                info!("Remote stylesheet fetch cancelled");
                break;
            }
            match self.fetch_one(url) {
                Ok(path) => {
                    debug!("Cached {} as {}", url, path.display());
                    fetched += 1;
                }
                Err(e) => warn!("Skipping remote stylesheet {}: {}", url, e),
            }
        }

        if !urls.is_empty() {
            info!("Fetched {}/{} remote stylesheets", fetched, urls.len());
        }
        self.cached_stylesheets()
    }

    fn fetch_one(&self, raw_url: &str) -> Result<PathBuf> {
        let url = normalize_url(raw_url);
        let target = self.cache_dir.join(cache_file_name(&url)?);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| IndexError::Fetch(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IndexError::Fetch(format!(
                "server returned status {}",
                response.status()
            )));
        }

        let body = response
            .bytes()
            .map_err(|e| IndexError::Fetch(format!("failed to read body: {e}")))?;
        fs::write(&target, &body)?;
        Ok(target)
    }

    /// Remove stylesheets left over from the previous rebuild
    fn prepare_cache_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.cache_dir)?;
        for entry in fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            if path.is_file() && is_css(&path) {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    fn cached_stylesheets(&self) -> Result<Vec<DocumentId>> {
        let mut cached = Vec::new();
        for entry in fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            if path.is_file() && is_css(&path) {
                cached.push(DocumentId::new(path));
            }
        }
        cached.sort();
        Ok(cached)
    }
}

impl std::fmt::Debug for RemoteStylesheets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStylesheets")
            .field("cache_dir", &self.cache_dir)
            .field("cancelled", &self.cancelled.load(Ordering::Relaxed))
            .finish()
    }
}

/// Protocol-relative URLs (`//cdn.example/x.css`) are fetched over https
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => trimmed.to_string(),
    }
}

/// Cache file name for a URL: its last path segment, or the md5 of the URL
/// when the path has none. Always ends in `.css`.
pub fn cache_file_name(url: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| IndexError::Fetch(format!("invalid URL '{url}': {e}")))?;

    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string);

    let name = segment.unwrap_or_else(|| format!("{:x}", md5::compute(url.as_bytes())));
    if name.to_ascii_lowercase().ends_with(".css") {
        Ok(name)
    } else {
        Ok(format!("{}.css", name))
    }
}

/// hrefs of every `<link rel="stylesheet">` in a markup document, with
/// protocol-relative URLs normalized. Relative hrefs are dropped since they
/// point back into the workspace.
pub fn extract_stylesheet_links(markup: &str) -> Vec<String> {
    LINK_TAG_RE
        .find_iter(markup)
        .map(|tag| tag.as_str())
        .filter(|tag| REL_STYLESHEET_RE.is_match(tag))
        .filter_map(|tag| {
            let caps = HREF_RE.captures(tag)?;
            caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().trim())
        })
        .filter(|href| !href.is_empty())
        .map(normalize_url)
        .filter(|href| href.starts_with("http://") || href.starts_with("https://"))
        .collect()
}

fn is_css(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("css"))
}
