//! Save watcher for workspace sessions.
//!
//! Watches the workspace on a background thread and keeps a
//! [`SelectorIndex`] current without editor integration:
//! - Saves, creations and deletions of save-trigger kinds patch the index
//! - A change to `.selector-index.json` reloads the config and re-indexes
//! - Blake3 content hashes drop events for files whose content did not change
//! - Events are batched and flushed once the workspace has been quiet for 200ms

use crate::config::CONFIG_FILE_NAME;
use crate::session::{PatchOutcome, SelectorIndex};
use anyhow::{Context, Result};
use dashmap::DashMap;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Quiet period after the last event before a batch is applied
const BATCH_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Created,
    Modified,
    Deleted,
}

/// A file change with its new content hash (none for deletions)
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: FileEventKind,
    pub new_hash: Option<String>,
}

/// Thread-safe hash storage for tracking file content changes
type HashStore = Arc<DashMap<PathBuf, String>>;

enum WatcherMessage {
    Stop,
}

/// Background watcher feeding file changes into a [`SelectorIndex`]
pub struct SaveWatcher {
    workspace_path: PathBuf,
    known_hashes: HashStore,
    running: Arc<AtomicBool>,
    stop_tx: Option<Sender<WatcherMessage>>,
    watcher_thread: Option<JoinHandle<()>>,
}

impl SaveWatcher {
    /// Start watching the workspace the index was opened on
    pub fn start(index: Arc<SelectorIndex>) -> Result<Self> {
        let workspace = index
            .workspace_root()
            .map(Path::to_path_buf)
            .context("Cannot watch a session that was not opened on a workspace")?;
        if !workspace.is_dir() {
            anyhow::bail!("Workspace path is not a directory: {}", workspace.display());
        }

        let known_hashes: HashStore = Arc::new(DashMap::new());
        seed_hashes(&index, &known_hashes);
        let running = Arc::new(AtomicBool::new(true));
        let (stop_tx, stop_rx) = channel::<WatcherMessage>();

        let thread_workspace = workspace.clone();
        let thread_hashes = Arc::clone(&known_hashes);
        let thread_running = Arc::clone(&running);

        info!("Starting save watcher for: {:?}", workspace);

        let handle = thread::Builder::new()
            .name("selector-index-watcher".to_string())
            .spawn(move || {
                if let Err(e) = run_watcher(
                    thread_workspace,
                    index,
                    thread_hashes,
                    Arc::clone(&thread_running),
                    stop_rx,
                ) {
                    error!("Save watcher error: {:?}", e);
                }
                thread_running.store(false, Ordering::SeqCst);
            })
            .context("Failed to spawn watcher thread")?;

        Ok(Self {
            workspace_path: workspace,
            known_hashes,
            running,
            stop_tx: Some(stop_tx),
            watcher_thread: Some(handle),
        })
    }

    /// Stop watching and wait for the background thread. Safe to call twice.
    pub fn stop(&mut self) {
        if self.watcher_thread.is_none() {
            return;
        }

        info!("Stopping save watcher for {:?}", self.workspace_path);
        self.running.store(false, Ordering::SeqCst);
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(WatcherMessage::Stop);
        }
        if let Some(handle) = self.watcher_thread.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn tracked_file_count(&self) -> usize {
        self.known_hashes.len()
    }
}

impl Drop for SaveWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Hash every indexed document so the first untouched save is dropped
fn seed_hashes(index: &SelectorIndex, known_hashes: &HashStore) {
    let documents: Vec<PathBuf> =
        index.read(|store| store.documents().map(|id| id.path().to_path_buf()).collect());
    for path in documents {
        if let Ok(hash) = compute_hash(&path) {
            known_hashes.insert(path, hash);
        }
    }
    debug!("Save watcher tracking {} file hashes", known_hashes.len());
}

/// Gitignore matcher from the workspace `.gitignore` plus built-in defaults
fn build_gitignore(workspace: &Path) -> Option<Gitignore> {
    let mut builder = GitignoreBuilder::new(workspace);

    let _ = builder.add_line(None, ".git/");
    let _ = builder.add_line(None, "node_modules/");

    let gitignore_path = workspace.join(".gitignore");
    if gitignore_path.exists() {
        if let Some(e) = builder.add(&gitignore_path) {
            warn!("Failed to parse .gitignore: {:?}", e);
        }
    }

    match builder.build() {
        Ok(gi) => Some(gi),
        Err(e) => {
            warn!("Failed to build gitignore matcher: {:?}", e);
            None
        }
    }
}

fn should_ignore(path: &Path, workspace: &Path, gitignore: &Option<Gitignore>) -> bool {
    let rel_path = match path.strip_prefix(workspace) {
        Ok(p) => p,
        Err(_) => return true,
    };

    if let Some(gi) = gitignore {
        if gi
            .matched_path_or_any_parents(rel_path, path.is_dir())
            .is_ignore()
        {
            return true;
        }
    }

    // Hidden files are never indexed, but the config file must get through
    if let Some(name) = path.file_name() {
        let name_str = name.to_string_lossy();
        if name_str.starts_with('.') && name_str != CONFIG_FILE_NAME {
            return true;
        }
    }

    false
}

fn compute_hash(path: &Path) -> Result<String> {
    let content = fs::read(path).context("Failed to read file")?;
    Ok(blake3::hash(&content).to_hex().to_string())
}

fn run_watcher(
    workspace: PathBuf,
    index: Arc<SelectorIndex>,
    known_hashes: HashStore,
    running: Arc<AtomicBool>,
    stop_rx: Receiver<WatcherMessage>,
) -> Result<()> {
    let gitignore = build_gitignore(&workspace);
    let (event_tx, event_rx) = channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            let _ = event_tx.send(res);
        },
        Config::default(),
    )
    .map_err(crate::error::IndexError::from)?;

    watcher
        .watch(&workspace, RecursiveMode::Recursive)
        .map_err(crate::error::IndexError::from)?;
    info!(
        "Save watcher active on {:?} ({} files tracked)",
        workspace,
        known_hashes.len()
    );

    let mut pending_changes: Vec<FileChange> = Vec::new();

    while running.load(Ordering::SeqCst) {
        if stop_rx.try_recv().is_ok() {
            break;
        }

        match event_rx.recv_timeout(BATCH_TIMEOUT) {
            Ok(Ok(event)) => {
                for path in event.paths.iter() {
                    if path.is_dir() || should_ignore(path, &workspace, &gitignore) {
                        continue;
                    }
                    if let Some(change) = process_event(path, &event.kind, &known_hashes) {
                        pending_changes.push(change);
                    }
                }
            }
            Ok(Err(e)) => {
                warn!("Watch error: {:?}", e);
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                if !pending_changes.is_empty() {
                    flush_changes(&mut pending_changes, &index, &known_hashes);
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                break;
            }
        }
    }

    if !pending_changes.is_empty() {
        flush_changes(&mut pending_changes, &index, &known_hashes);
    }

    Ok(())
}

/// Turn a raw notify event into a change, or `None` when content is unchanged
fn process_event(path: &Path, event_kind: &EventKind, known_hashes: &HashStore) -> Option<FileChange> {
    match event_kind {
        EventKind::Create(_) | EventKind::Modify(_) => {
            if !path.is_file() {
                return None;
            }

            match compute_hash(path) {
                Ok(new_hash) => {
                    let old_hash = known_hashes.get(path);
                    if old_hash.as_deref().map(|h| h.as_str()) == Some(new_hash.as_str()) {
                        debug!("File touched but content unchanged: {:?}", path);
                        return None;
                    }

                    let kind = if matches!(event_kind, EventKind::Create(_)) {
                        FileEventKind::Created
                    } else {
                        FileEventKind::Modified
                    };
                    Some(FileChange {
                        path: path.to_path_buf(),
                        kind,
                        new_hash: Some(new_hash),
                    })
                }
                Err(e) => {
                    debug!("Failed to hash {:?}: {:?}", path, e);
                    None
                }
            }
        }

        EventKind::Remove(_) => Some(FileChange {
            path: path.to_path_buf(),
            kind: FileEventKind::Deleted,
            new_hash: None,
        }),

        _ => None,
    }
}

/// Apply a batch: a config change wins over individual patches
fn flush_changes(changes: &mut Vec<FileChange>, index: &SelectorIndex, known_hashes: &HashStore) {
    if changes.is_empty() {
        return;
    }

    debug!("Applying {} file changes", changes.len());

    let mut config_changed = false;
    let mut seen = std::collections::HashSet::new();
    let mut paths = Vec::new();
    for change in changes.drain(..) {
        match change.kind {
            FileEventKind::Deleted => {
                known_hashes.remove(&change.path);
            }
            _ => {
                if let Some(hash) = change.new_hash {
                    known_hashes.insert(change.path.clone(), hash);
                }
            }
        }

        if change.path.file_name().is_some_and(|name| name == CONFIG_FILE_NAME) {
            config_changed = true;
        } else if seen.insert(change.path.clone()) {
            paths.push(change.path);
        }
    }

    if config_changed {
        match index.reload_config() {
            Ok(status) => info!("Re-indexed after configuration change: {:?}", status),
            Err(e) => error!("Failed to apply configuration change: {:#}", e),
        }
        return;
    }

    let patched = paths
        .iter()
        .filter(|path| matches!(index.handle_save(path), PatchOutcome::Patched(_)))
        .count();
    if patched > 0 {
        info!("Patched selector index for {} changed files", patched);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::SelectorDefinition;
    use crate::index::SelectorLookup;
    use crate::session::{RebuildStatus, RebuildTrigger};
    use tempfile::TempDir;

    fn change(path: PathBuf, kind: FileEventKind) -> FileChange {
        let new_hash = match kind {
            FileEventKind::Deleted => None,
            _ => compute_hash(&path).ok(),
        };
        FileChange {
            path,
            kind,
            new_hash,
        }
    }

    fn workspace_index(root: &Path) -> Arc<SelectorIndex> {
        let index = SelectorIndex::open_workspace(root).unwrap();
        assert!(matches!(
            index.rebuild(RebuildTrigger::Startup).unwrap(),
            RebuildStatus::Completed(_)
        ));
        Arc::new(index)
    }

    #[test]
    fn test_compute_hash() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("site.css");
        fs::write(&file_path, ".a{}").unwrap();

        let hash = compute_hash(&file_path).unwrap();
        assert_eq!(hash.len(), 64); // Blake3 hex is 64 chars

        fs::write(&file_path, ".b{}").unwrap();
        assert_ne!(compute_hash(&file_path).unwrap(), hash);
    }

    #[test]
    fn test_unchanged_content_is_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("index.html");
        fs::write(&file_path, "<p></p>").unwrap();

        let hashes: HashStore = Arc::new(DashMap::new());
        let modify = EventKind::Modify(notify::event::ModifyKind::Any);
        assert!(process_event(&file_path, &modify, &hashes).is_some());

        hashes.insert(file_path.clone(), compute_hash(&file_path).unwrap());
        assert!(process_event(&file_path, &modify, &hashes).is_none());

        fs::write(&file_path, r#"<p class="x"></p>"#).unwrap();
        let changed = process_event(&file_path, &modify, &hashes).unwrap();
        assert_eq!(changed.kind, FileEventKind::Modified);

        let remove = EventKind::Remove(notify::event::RemoveKind::File);
        let removed = process_event(&file_path, &remove, &hashes).unwrap();
        assert_eq!(removed.kind, FileEventKind::Deleted);
    }

    #[test]
    fn test_should_ignore_gitignore_patterns() {
        let temp_dir = TempDir::new().unwrap();
        let workspace = temp_dir.path();

        fs::write(workspace.join(".gitignore"), "dist/\n").unwrap();
        fs::create_dir(workspace.join("dist")).unwrap();
        fs::write(workspace.join("dist/app.css"), ".app{}").unwrap();
        fs::create_dir(workspace.join("views")).unwrap();
        fs::write(workspace.join("views/home.twig"), "").unwrap();

        let gitignore = build_gitignore(workspace);

        assert!(should_ignore(&workspace.join("dist/app.css"), workspace, &gitignore));
        assert!(should_ignore(
            &workspace.join("node_modules/x/x.css"),
            workspace,
            &gitignore
        ));
        assert!(!should_ignore(&workspace.join("views/home.twig"), workspace, &gitignore));
        assert!(should_ignore(Path::new("/elsewhere/a.css"), workspace, &gitignore));
    }

    #[test]
    fn test_hidden_files_ignored_except_config() {
        let temp_dir = TempDir::new().unwrap();
        let workspace = temp_dir.path();

        assert!(should_ignore(&workspace.join(".env"), workspace, &None));
        assert!(should_ignore(&workspace.join(".hidden.css"), workspace, &None));
        assert!(!should_ignore(&workspace.join(CONFIG_FILE_NAME), workspace, &None));
    }

    #[test]
    fn test_flush_patches_saved_documents() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let page = root.join("index.html");
        fs::write(&page, r#"<p class="old"></p>"#).unwrap();
        let index = workspace_index(root);
        let hashes: HashStore = Arc::new(DashMap::new());

        fs::write(&page, r#"<p class="new"></p>"#).unwrap();
        let mut changes = vec![change(page.clone(), FileEventKind::Modified)];
        flush_changes(&mut changes, &index, &hashes);

        assert!(changes.is_empty());
        assert_eq!(hashes.len(), 1);
        assert_eq!(index.unique_definitions(), vec![SelectorDefinition::class("new")]);

        fs::remove_file(&page).unwrap();
        let mut changes = vec![change(page.clone(), FileEventKind::Deleted)];
        flush_changes(&mut changes, &index, &hashes);

        assert!(hashes.is_empty());
        assert!(index.unique_definitions().is_empty());
    }

    #[test]
    fn test_flush_skips_excluded_documents() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        fs::write(root.join("index.html"), r#"<p class="hero"></p>"#).unwrap();
        fs::write(root.join(CONFIG_FILE_NAME), r#"{ "exclude": ["legacy/**"] }"#).unwrap();
        let index = workspace_index(&root);

        fs::create_dir_all(root.join("legacy")).unwrap();
        let excluded = root.join("legacy/old.html");
        fs::write(&excluded, r#"<p class="retro2"></p>"#).unwrap();
        let mut changes = vec![change(excluded, FileEventKind::Created)];
        flush_changes(&mut changes, &index, &Arc::new(DashMap::new()));

        assert_eq!(index.unique_definitions(), vec![SelectorDefinition::class("hero")]);
    }

    #[test]
    fn test_flush_reloads_config() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("index.html"), r#"<p class="kept"></p>"#).unwrap();
        fs::write(root.join("theme.scss"), ".dropped{}").unwrap();
        let index = workspace_index(root);
        assert_eq!(index.stats().unique, 2);

        let config_path = root.join(CONFIG_FILE_NAME);
        fs::write(&config_path, r#"{ "include": ["**/*.html"] }"#).unwrap();
        let mut changes = vec![
            change(root.join("index.html"), FileEventKind::Modified),
            change(config_path, FileEventKind::Created),
        ];
        flush_changes(&mut changes, &index, &Arc::new(DashMap::new()));

        assert_eq!(index.unique_definitions(), vec![SelectorDefinition::class("kept")]);
        assert_eq!(index.config().include, vec!["**/*.html".to_string()]);
    }

    #[test]
    fn test_start_and_stop() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("site.css"), ".a{}").unwrap();
        let index = workspace_index(temp_dir.path());

        let mut watcher = SaveWatcher::start(Arc::clone(&index)).unwrap();
        assert_eq!(watcher.tracked_file_count(), 1);
        watcher.stop();
        assert!(!watcher.is_running());
        watcher.stop();
    }

    #[test]
    fn test_start_requires_workspace_session() {
        let index = SelectorIndex::new(
            crate::config::IndexConfig::default(),
            Arc::new(crate::discovery::InMemorySource::new()),
        );
        assert!(SaveWatcher::start(Arc::new(index)).is_err());
    }
}
