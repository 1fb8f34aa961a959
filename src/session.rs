//! SelectorIndex - one indexing session
//!
//! Owns the [`IndexStore`] and everything needed to keep it current: the
//! active configuration and document source, the parse dispatcher, and the
//! coordination state for concurrent triggers.
//!
//! Locking: every mutation of the store goes through `write_gate`, and the
//! store itself sits behind an `RwLock` so readers never see a half-applied
//! rebuild or patch. Parsing happens outside both locks, so a save can land
//! while a rebuild is still reading. The gate remembers every document
//! patched since the last applied rebuild, and the rebuild re-reads those
//! before it replaces the index.

use crate::config::IndexConfig;
use crate::discovery::{DocumentSource, WorkspaceSource};
use crate::extractors::{DocumentId, ExtractorRegistry, SelectorDefinition};
use crate::index::{
    DispatchOutcome, DispatchProgress, DispatchReport, DocumentParse, IndexStore,
    ParseDispatcher, ParsedDocument, PatchSummary, RebuildSummary, SelectorLookup,
};
use anyhow::{Context, Result};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use tracing::{debug, info, trace, warn};

/// What asked for a rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildTrigger {
    Startup,
    Manual,
    /// Never dropped: supersedes any pass already in flight
    ConfigChanged,
}

impl RebuildTrigger {
    /// Guarded triggers are dropped while another guarded rebuild runs
    fn is_guarded(self) -> bool {
        !matches!(self, RebuildTrigger::ConfigChanged)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RebuildStatus {
    Completed(RebuildSummary),
    /// Discovery found nothing; the index was cleared
    NoDocuments,
    /// Another guarded rebuild was in flight; nothing was done
    AlreadyRunning,
    /// A newer pass started while this one was parsing; its results were discarded
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Patched(PatchSummary),
    /// Unknown kind, no extractor, or (for saves) not a save-trigger kind
    /// or outside the source's selection
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub files: usize,
    pub definitions: usize,
    pub unique: usize,
    pub referenced_names: usize,
}

struct Session {
    config: Arc<IndexConfig>,
    source: Arc<dyn DocumentSource>,
}

/// Clears the in-flight flag when a guarded rebuild ends, however it ends
struct RebuildGuard<'a>(&'a AtomicBool);

impl<'a> RebuildGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RebuildGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SelectorIndex {
    dispatcher: ParseDispatcher,
    session: RwLock<Session>,
    store: RwLock<IndexStore>,
    /// Documents patched since the last applied rebuild
    write_gate: Mutex<HashSet<DocumentId>>,
    rebuilding: AtomicBool,
    generation: AtomicU64,
    workspace_root: Option<PathBuf>,
    cancelled: Arc<AtomicBool>,
}

impl SelectorIndex {
    /// Session over `source` with the built-in extractors
    pub fn new(config: IndexConfig, source: Arc<dyn DocumentSource>) -> Self {
        Self::with_registry(config, source, ExtractorRegistry::with_defaults())
    }

    pub fn with_registry(
        config: IndexConfig,
        source: Arc<dyn DocumentSource>,
        registry: ExtractorRegistry,
    ) -> Self {
        let store = IndexStore::new(config.reference_bearing_kinds());
        Self {
            dispatcher: ParseDispatcher::new(Arc::new(registry)),
            session: RwLock::new(Session {
                config: Arc::new(config),
                source,
            }),
            store: RwLock::new(store),
            write_gate: Mutex::new(HashSet::new()),
            rebuilding: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            workspace_root: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Session over a workspace directory, configured from its
    /// `.selector-index.json` (defaults when absent). The index starts empty;
    /// call [`rebuild`](Self::rebuild) with [`RebuildTrigger::Startup`].
    pub fn open_workspace(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let root = root
            .canonicalize()
            .with_context(|| format!("Workspace root {} not found", root.display()))?;
        let config = IndexConfig::load_for_workspace(&root)
            .with_context(|| format!("Failed to load configuration for {}", root.display()))?;
        let cancelled = Arc::new(AtomicBool::new(false));
        let source = WorkspaceSource::from_config(&root, &config)
            .with_context(|| format!("Invalid document patterns for {}", root.display()))?
            .with_cancellation(Arc::clone(&cancelled));

        info!("Opened selector index for {}", root.display());
        let mut index = Self::new(config, Arc::new(source));
        index.workspace_root = Some(root);
        index.cancelled = cancelled;
        Ok(index)
    }

    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    pub fn config(&self) -> Arc<IndexConfig> {
        Arc::clone(&self.read_session().config)
    }

    pub fn is_rebuilding(&self) -> bool {
        self.rebuilding.load(Ordering::Acquire)
    }

    /// Stop starting remote stylesheet downloads, for the rest of the session
    pub fn cancel_remote_fetches(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn rebuild(&self, trigger: RebuildTrigger) -> Result<RebuildStatus> {
        self.rebuild_with_progress(trigger, |progress| {
            trace!("Parsed {}/{} documents", progress.completed, progress.total);
        })
    }

    /// Full rescan: discover, parse every document, replace the index
    ///
    /// A discovery failure is returned with context and leaves the current
    /// index untouched.
    pub fn rebuild_with_progress<P>(
        &self,
        trigger: RebuildTrigger,
        progress: P,
    ) -> Result<RebuildStatus>
    where
        P: Fn(DispatchProgress) + Sync,
    {
        let _guard = if trigger.is_guarded() {
            match RebuildGuard::acquire(&self.rebuilding) {
                Some(guard) => Some(guard),
                None => {
                    debug!("Ignoring {:?} rebuild: another rebuild is running", trigger);
                    return Ok(RebuildStatus::AlreadyRunning);
                }
            }
        } else {
            None
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (config, source) = {
            let session = self.read_session();
            (Arc::clone(&session.config), Arc::clone(&session.source))
        };
        info!("Rebuilding selector index ({:?}, pass {})", trigger, generation);

        let outcome = match self.discover_and_parse(source.as_ref(), &config, progress) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.abandon(generation);
                return Err(e);
            }
        };

        let mut patched = self.lock_gate();
        if self.generation.load(Ordering::SeqCst) != generation {
            info!("Discarding rebuild pass {}: superseded", generation);
            return Ok(RebuildStatus::Superseded);
        }

        let mut report = match outcome {
            DispatchOutcome::NoDocuments => DispatchReport::default(),
            DispatchOutcome::Finished(report) => report,
        };
        self.refresh_patched(source.as_ref(), &mut report, patched.drain());

        let mut store = self.write_store();
        store.set_reference_kinds(config.reference_bearing_kinds());
        if report.total() == 0 {
            store.clear();
            info!("No documents found, selector index cleared");
            return Ok(RebuildStatus::NoDocuments);
        }
        let summary = store.apply_rebuild(report);
        log_summary(&summary);
        Ok(RebuildStatus::Completed(summary))
    }

    fn discover_and_parse<P>(
        &self,
        source: &dyn DocumentSource,
        config: &IndexConfig,
        progress: P,
    ) -> Result<DispatchOutcome>
    where
        P: Fn(DispatchProgress) + Sync,
    {
        let locations = source.list_all().context("Document discovery failed")?;
        let outcome = self
            .dispatcher
            .dispatch_with_progress(source, &locations, config.concurrency, progress)
            .context("Parse dispatch failed")?;
        Ok(outcome)
    }

    /// Give back a failed pass's generation unless a newer pass has started
    fn abandon(&self, generation: u64) {
        let _ = self.generation.compare_exchange(
            generation,
            generation - 1,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Re-read documents patched while the pass was parsing so the rebuild
    /// does not apply text older than the patch
    fn refresh_patched(
        &self,
        source: &dyn DocumentSource,
        report: &mut DispatchReport,
        patched: impl Iterator<Item = DocumentId>,
    ) {
        let mut refreshed = 0;
        for location in patched {
            let parse = self.dispatcher.parse_one(source, &location);
            if report.contains(&location) || matches!(parse, DocumentParse::Parsed(_)) {
                report.replace(&location, parse);
                refreshed += 1;
            }
        }
        if refreshed > 0 {
            debug!("Re-read {} documents saved during the rebuild", refreshed);
        }
    }

    /// Re-parse one document and fold it into the index
    pub fn patch(&self, path: impl AsRef<Path>) -> PatchOutcome {
        let (config, source) = {
            let session = self.read_session();
            (Arc::clone(&session.config), Arc::clone(&session.source))
        };
        self.patch_with(&config, source.as_ref(), DocumentId::new(path.as_ref()))
    }

    /// Save hook: patches documents of save-trigger kinds, ignores the rest
    pub fn handle_save(&self, path: impl AsRef<Path>) -> PatchOutcome {
        let (config, source) = {
            let session = self.read_session();
            (Arc::clone(&session.config), Arc::clone(&session.source))
        };
        let location = DocumentId::new(path.as_ref());
        if !source.accepts(&location) {
            trace!("Save of {} is outside the indexed documents", location);
            return PatchOutcome::Skipped;
        }
        match source.document_kind(&location) {
            Some(kind) if config.triggers_on_save(&kind) => {
                self.patch_with(&config, source.as_ref(), location)
            }
            _ => {
                trace!("Save of {} does not trigger indexing", location);
                PatchOutcome::Skipped
            }
        }
    }

    fn patch_with(
        &self,
        config: &IndexConfig,
        source: &dyn DocumentSource,
        location: DocumentId,
    ) -> PatchOutcome {
        let parsed = match self.dispatcher.parse_one(source, &location) {
            DocumentParse::Parsed(parsed) => parsed,
            DocumentParse::Failed(failure) => {
                warn!(
                    "Failed to parse {}: {}. Treating it as defining nothing",
                    failure.location, failure.reason
                );
                let Some(kind) = source.document_kind(&location) else {
                    return PatchOutcome::Skipped;
                };
                ParsedDocument {
                    location,
                    kind,
                    definitions: Vec::new(),
                }
            }
            DocumentParse::Unsupported => {
                trace!("No extractor for {}", location);
                return PatchOutcome::Skipped;
            }
        };

        let mut patched = self.lock_gate();
        patched.insert(parsed.location.clone());
        let mut store = self.write_store();
        store.set_reference_kinds(config.reference_bearing_kinds());
        PatchOutcome::Patched(store.patch_one(parsed))
    }

    /// Swap configuration and source, then rebuild. The rebuild supersedes
    /// any pass already running.
    pub fn reconfigure(
        &self,
        config: IndexConfig,
        source: Arc<dyn DocumentSource>,
    ) -> Result<RebuildStatus> {
        {
            let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
            session.config = Arc::new(config);
            session.source = source;
        }
        self.rebuild(RebuildTrigger::ConfigChanged)
    }

    /// Re-read the workspace configuration file and reconfigure from it
    pub fn reload_config(&self) -> Result<RebuildStatus> {
        let root = self
            .workspace_root
            .as_deref()
            .context("Session was not opened on a workspace")?;
        let config = IndexConfig::load_for_workspace(root)
            .with_context(|| format!("Failed to reload configuration for {}", root.display()))?;
        let source = WorkspaceSource::from_config(root, &config)
            .with_context(|| format!("Invalid document patterns for {}", root.display()))?
            .with_cancellation(Arc::clone(&self.cancelled));

        info!("Configuration changed, re-indexing {}", root.display());
        self.reconfigure(config, Arc::new(source))
    }

    /// Run `f` with shared access to the store
    pub fn read<R>(&self, f: impl FnOnce(&IndexStore) -> R) -> R {
        f(&self.read_store())
    }

    pub fn stats(&self) -> IndexStats {
        self.read(|store| IndexStats {
            files: store.file_count(),
            definitions: store.occurrences().len(),
            unique: store.unique_definitions().len(),
            referenced_names: store.reverse_index().len(),
        })
    }

    fn lock_gate(&self) -> MutexGuard<'_, HashSet<DocumentId>> {
        self.write_gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_session(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_store(&self) -> RwLockReadGuard<'_, IndexStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, IndexStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SelectorLookup for SelectorIndex {
    fn unique_definitions(&self) -> Vec<SelectorDefinition> {
        self.read(|store| store.unique_definitions().to_vec())
    }

    fn referencing_files(&self, name: &str) -> BTreeSet<DocumentId> {
        self.read(|store| store.referencing_files(name))
    }
}

impl std::fmt::Debug for SelectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectorIndex")
            .field("workspace_root", &self.workspace_root)
            .field("rebuilding", &self.is_rebuilding())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .field("stats", &self.stats())
            .finish()
    }
}

fn log_summary(summary: &RebuildSummary) {
    info!(
        "Indexed {} documents: {} definitions ({} unique), {} skipped, {} failed",
        summary.documents,
        summary.definitions,
        summary.unique,
        summary.skipped,
        summary.failure_count()
    );
    if !summary.failures.is_empty() {
        let failed: Vec<String> = summary
            .failures
            .iter()
            .map(|failure| format!("{} ({})", failure.location, failure.reason))
            .collect();
        warn!("Failed to parse: {}", failed.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE_NAME;
    use crate::discovery::InMemorySource;
    use std::fs;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Parks a thread until the test releases it
    #[derive(Default)]
    struct Latch {
        entered: AtomicBool,
        released: AtomicBool,
    }

    impl Latch {
        fn block(&self) {
            self.entered.store(true, Ordering::SeqCst);
            while !self.released.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
        }

        fn wait_until_entered(&self) {
            while !self.entered.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
        }

        fn release(&self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    /// Source whose discovery blocks until released
    struct GatedSource {
        inner: Arc<InMemorySource>,
        latch: Latch,
    }

    impl GatedSource {
        fn new(inner: Arc<InMemorySource>) -> Self {
            Self {
                inner,
                latch: Latch::default(),
            }
        }
    }

    impl DocumentSource for GatedSource {
        fn list_all(&self) -> Result<Vec<DocumentId>> {
            self.latch.block();
            self.inner.list_all()
        }

        fn read_text(&self, id: &DocumentId) -> Result<String> {
            self.inner.read_text(id)
        }
    }

    /// Source whose first read of one document blocks after the text was read
    struct StalledRead {
        inner: Arc<InMemorySource>,
        stalled: DocumentId,
        armed: AtomicBool,
        latch: Latch,
    }

    impl StalledRead {
        fn new(inner: Arc<InMemorySource>, stalled: &str) -> Self {
            Self {
                inner,
                stalled: DocumentId::from(stalled),
                armed: AtomicBool::new(true),
                latch: Latch::default(),
            }
        }
    }

    impl DocumentSource for StalledRead {
        fn list_all(&self) -> Result<Vec<DocumentId>> {
            self.inner.list_all()
        }

        fn read_text(&self, id: &DocumentId) -> Result<String> {
            let text = self.inner.read_text(id)?;
            if *id == self.stalled && self.armed.swap(false, Ordering::SeqCst) {
                self.latch.block();
            }
            Ok(text)
        }
    }

    struct BrokenSource;

    impl DocumentSource for BrokenSource {
        fn list_all(&self) -> Result<Vec<DocumentId>> {
            anyhow::bail!("disk on fire")
        }
    }

    fn button_source() -> InMemorySource {
        InMemorySource::with_documents([
            ("a.html", r#"<button class="btn primary">Go</button>"#),
            ("b.css", ".btn{color:red}"),
        ])
    }

    fn completed(status: RebuildStatus) -> RebuildSummary {
        match status {
            RebuildStatus::Completed(summary) => summary,
            other => panic!("expected a completed rebuild, got {:?}", other),
        }
    }

    #[test]
    fn test_startup_rebuild_serves_lookups() {
        let index = SelectorIndex::new(IndexConfig::default(), Arc::new(button_source()));
        let summary = completed(index.rebuild(RebuildTrigger::Startup).unwrap());

        assert_eq!(summary.documents, 2);
        assert_eq!(
            index.unique_definitions(),
            vec![SelectorDefinition::class("btn"), SelectorDefinition::class("primary")]
        );
        assert_eq!(
            index.referencing_files("btn"),
            [DocumentId::from("a.html")].into_iter().collect::<BTreeSet<_>>()
        );
        assert!(!index.is_rebuilding());
    }

    #[test]
    fn test_guarded_rebuild_is_dropped_while_one_runs() {
        let source = Arc::new(GatedSource::new(Arc::new(button_source())));
        let index = SelectorIndex::new(IndexConfig::default(), source.clone());

        thread::scope(|scope| {
            let running = scope.spawn(|| index.rebuild(RebuildTrigger::Manual).unwrap());
            source.latch.wait_until_entered();

            assert!(index.is_rebuilding());
            assert_eq!(
                index.rebuild(RebuildTrigger::Manual).unwrap(),
                RebuildStatus::AlreadyRunning
            );
            assert_eq!(
                index.rebuild(RebuildTrigger::Startup).unwrap(),
                RebuildStatus::AlreadyRunning
            );

            source.latch.release();
            completed(running.join().unwrap());
        });
        assert!(!index.is_rebuilding());
    }

    #[test]
    fn test_config_change_supersedes_running_rebuild() {
        let stale = Arc::new(GatedSource::new(Arc::new(button_source())));
        let index = SelectorIndex::new(IndexConfig::default(), stale.clone());
        let fresh = InMemorySource::with_documents([("c.html", r#"<p class="fresh"></p>"#)]);

        thread::scope(|scope| {
            let running = scope.spawn(|| index.rebuild(RebuildTrigger::Manual).unwrap());
            stale.latch.wait_until_entered();

            let status = index
                .reconfigure(IndexConfig::default(), Arc::new(fresh))
                .unwrap();
            assert_eq!(completed(status).documents, 1);

            stale.latch.release();
            assert_eq!(running.join().unwrap(), RebuildStatus::Superseded);
        });

        assert_eq!(index.unique_definitions(), vec![SelectorDefinition::class("fresh")]);
    }

    #[test]
    fn test_save_during_rebuild_survives_apply() {
        let documents = Arc::new(InMemorySource::with_documents([(
            "a.html",
            r#"<p class="old"></p>"#,
        )]));
        let source = Arc::new(StalledRead::new(Arc::clone(&documents), "a.html"));
        let index = SelectorIndex::new(IndexConfig::default(), source.clone());

        thread::scope(|scope| {
            let running = scope.spawn(|| index.rebuild(RebuildTrigger::Manual).unwrap());
            // The rebuild has read the old text and is parked
            source.latch.wait_until_entered();

            documents.insert("a.html", r#"<p class="new"></p>"#);
            assert!(matches!(index.handle_save("a.html"), PatchOutcome::Patched(_)));
            assert_eq!(index.unique_definitions(), vec![SelectorDefinition::class("new")]);

            source.latch.release();
            assert_eq!(completed(running.join().unwrap()).documents, 1);
        });

        assert_eq!(index.unique_definitions(), vec![SelectorDefinition::class("new")]);
        assert!(index.referencing_files("old").is_empty());
        assert_eq!(
            index.referencing_files("new"),
            [DocumentId::from("a.html")].into_iter().collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn test_save_during_superseded_rebuild_is_kept() {
        let documents = Arc::new(button_source());
        let stale = Arc::new(GatedSource::new(Arc::clone(&documents)));
        let index = SelectorIndex::new(IndexConfig::default(), stale.clone());

        thread::scope(|scope| {
            let running = scope.spawn(|| index.rebuild(RebuildTrigger::Manual).unwrap());
            stale.latch.wait_until_entered();

            documents.insert("a.html", r#"<button class="btn ghost">Go</button>"#);
            assert!(matches!(index.handle_save("a.html"), PatchOutcome::Patched(_)));

            let status = index
                .reconfigure(IndexConfig::default(), documents.clone())
                .unwrap();
            assert_eq!(completed(status).documents, 2);

            stale.latch.release();
            assert_eq!(running.join().unwrap(), RebuildStatus::Superseded);
        });

        assert_eq!(
            index.unique_definitions(),
            vec![SelectorDefinition::class("btn"), SelectorDefinition::class("ghost")]
        );
        assert!(index.referencing_files("primary").is_empty());
        assert_eq!(
            index.referencing_files("ghost"),
            [DocumentId::from("a.html")].into_iter().collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn test_failed_discovery_does_not_discard_running_rebuild() {
        let source = Arc::new(GatedSource::new(Arc::new(button_source())));
        let index = SelectorIndex::new(IndexConfig::default(), source.clone());

        thread::scope(|scope| {
            let running = scope.spawn(|| index.rebuild(RebuildTrigger::Manual).unwrap());
            source.latch.wait_until_entered();

            assert!(index
                .reconfigure(IndexConfig::default(), Arc::new(BrokenSource))
                .is_err());

            source.latch.release();
            assert_eq!(completed(running.join().unwrap()).documents, 2);
        });

        assert_eq!(index.stats().unique, 2);
    }

    #[test]
    fn test_discovery_failure_keeps_previous_index() {
        let index = SelectorIndex::new(IndexConfig::default(), Arc::new(button_source()));
        completed(index.rebuild(RebuildTrigger::Startup).unwrap());

        let err = index
            .reconfigure(IndexConfig::default(), Arc::new(BrokenSource))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Document discovery failed"));
        assert!(format!("{:#}", err).contains("disk on fire"));
        assert_eq!(index.stats().unique, 2);

        // The in-flight flag was released: the retry fails again instead of being dropped
        assert!(index.rebuild(RebuildTrigger::Manual).is_err());
        assert!(!index.is_rebuilding());
    }

    #[test]
    fn test_empty_discovery_clears_index() {
        let index = SelectorIndex::new(IndexConfig::default(), Arc::new(button_source()));
        completed(index.rebuild(RebuildTrigger::Startup).unwrap());

        let status = index
            .reconfigure(IndexConfig::default(), Arc::new(InMemorySource::new()))
            .unwrap();

        assert_eq!(status, RebuildStatus::NoDocuments);
        assert_eq!(index.stats(), IndexStats::default());
    }

    #[test]
    fn test_save_hook_filters_by_kind() {
        let source = Arc::new(button_source());
        source.insert("page.php", r#"<p class="php-only"></p>"#);
        source.insert("main.rs", "fn main() {}");
        let index = SelectorIndex::new(IndexConfig::default(), source.clone());
        completed(index.rebuild(RebuildTrigger::Startup).unwrap());

        // php is indexed but does not trigger on save
        assert_eq!(index.handle_save("page.php"), PatchOutcome::Skipped);
        assert_eq!(index.handle_save("main.rs"), PatchOutcome::Skipped);
        assert_eq!(index.patch("main.rs"), PatchOutcome::Skipped);

        source.insert("a.html", r#"<button class="btn ghost">Go</button>"#);
        let outcome = index.handle_save("a.html");
        assert!(matches!(outcome, PatchOutcome::Patched(summary) if summary.removed == 2));
        assert!(index.referencing_files("primary").is_empty());
        assert!(index
            .unique_definitions()
            .contains(&SelectorDefinition::class("ghost")));
    }

    #[test]
    fn test_patch_of_deleted_document() {
        let source = Arc::new(button_source());
        let index = SelectorIndex::new(IndexConfig::default(), source.clone());
        completed(index.rebuild(RebuildTrigger::Startup).unwrap());

        source.remove(&DocumentId::from("a.html"));
        let outcome = index.patch("a.html");

        assert!(matches!(outcome, PatchOutcome::Patched(summary) if summary.appended == 0));
        assert!(index.referencing_files("btn").is_empty());
        assert_eq!(index.unique_definitions(), vec![SelectorDefinition::class("btn")]);
    }

    #[test]
    fn test_progress_reaches_total() {
        let index = SelectorIndex::new(IndexConfig::default(), Arc::new(button_source()));
        let last = Mutex::new(None);
        index
            .rebuild_with_progress(RebuildTrigger::Manual, |p| {
                *last.lock().unwrap() = Some(p);
            })
            .unwrap();
        assert_eq!(
            last.into_inner().unwrap(),
            Some(DispatchProgress {
                completed: 2,
                total: 2
            })
        );
    }

    #[test]
    fn test_workspace_session_reloads_config() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("index.html"), r#"<p class="hero"></p>"#).unwrap();
        fs::create_dir_all(root.join("legacy")).unwrap();
        fs::write(root.join("legacy/old.html"), r#"<p class="retro"></p>"#).unwrap();

        let index = SelectorIndex::open_workspace(root).unwrap();
        assert_eq!(index.workspace_root(), Some(root.canonicalize().unwrap().as_path()));
        completed(index.rebuild(RebuildTrigger::Startup).unwrap());
        assert_eq!(index.stats().unique, 2);

        fs::write(
            root.join(CONFIG_FILE_NAME),
            r#"{ "exclude": ["**/node_modules/**", "legacy/**"] }"#,
        )
        .unwrap();
        let summary = completed(index.reload_config().unwrap());

        assert_eq!(summary.documents, 1);
        assert_eq!(index.unique_definitions(), vec![SelectorDefinition::class("hero")]);
        assert_eq!(index.config().exclude.len(), 2);
    }

    #[test]
    fn test_workspace_root_is_canonical() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("sub")).unwrap();
        let page = root.join("index.html");
        fs::write(&page, r#"<p class="hero"></p>"#).unwrap();

        let index = SelectorIndex::open_workspace(root.join("sub/..")).unwrap();
        assert_eq!(index.workspace_root(), Some(root.as_path()));
        completed(index.rebuild(RebuildTrigger::Startup).unwrap());

        // Saves arrive with absolute paths and replace the discovered entry
        fs::write(&page, r#"<p class="banner"></p>"#).unwrap();
        assert!(matches!(index.handle_save(&page), PatchOutcome::Patched(_)));
        assert_eq!(index.stats().files, 1);
        assert_eq!(index.unique_definitions(), vec![SelectorDefinition::class("banner")]);

        assert!(SelectorIndex::open_workspace(root.join("missing")).is_err());
    }

    #[test]
    fn test_save_outside_configured_globs_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        fs::write(root.join("index.html"), r#"<p class="hero"></p>"#).unwrap();
        fs::write(root.join(CONFIG_FILE_NAME), r#"{ "exclude": ["legacy/**"] }"#).unwrap();
        let index = SelectorIndex::open_workspace(&root).unwrap();
        completed(index.rebuild(RebuildTrigger::Startup).unwrap());

        fs::create_dir_all(root.join("legacy")).unwrap();
        let excluded = root.join("legacy/old.html");
        fs::write(&excluded, r#"<p class="retro"></p>"#).unwrap();

        assert_eq!(index.handle_save(&excluded), PatchOutcome::Skipped);
        assert_eq!(index.unique_definitions(), vec![SelectorDefinition::class("hero")]);
    }

    #[test]
    fn test_reload_requires_workspace() {
        let index = SelectorIndex::new(IndexConfig::default(), Arc::new(InMemorySource::new()));
        assert!(index.reload_config().is_err());
    }
}
