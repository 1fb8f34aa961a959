//! Parse dispatch
//!
//! Runs extraction for many documents on a dedicated rayon pool sized to the
//! concurrency limit. One document failing (unreadable, or its extractor
//! panicking) never affects the others: it is recorded in the report and the
//! batch carries on.

use crate::discovery::DocumentSource;
use crate::error::Result;
use crate::extractors::{DocumentId, ExtractorRegistry, SelectorDefinition};
use rayon::prelude::*;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// A successfully parsed document
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub location: DocumentId,
    pub kind: String,
    pub definitions: Vec<SelectorDefinition>,
}

/// A document whose parse failed, with the reason
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    pub location: DocumentId,
    pub reason: String,
}

/// Completion count emitted after every document, whatever its outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchProgress {
    pub completed: usize,
    pub total: usize,
}

/// Outcome of parsing a single document
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentParse {
    Parsed(ParsedDocument),
    Failed(ParseFailure),
    /// No kind, or no extractor registered for the kind
    Unsupported,
}

/// Every input location lands in exactly one list, in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub succeeded: Vec<ParsedDocument>,
    pub failed: Vec<ParseFailure>,
    pub skipped: Vec<DocumentId>,
}

impl DispatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }

    pub fn contains(&self, location: &DocumentId) -> bool {
        self.succeeded.iter().any(|parsed| &parsed.location == location)
            || self.failed.iter().any(|failure| &failure.location == location)
            || self.skipped.contains(location)
    }

    /// Swap in a newer parse of `location`. A document that was already
    /// parsed keeps its position.
    pub fn replace(&mut self, location: &DocumentId, parse: DocumentParse) {
        self.failed.retain(|failure| &failure.location != location);
        self.skipped.retain(|skipped| skipped != location);
        match parse {
            DocumentParse::Parsed(parsed) => {
                match self.succeeded.iter_mut().find(|p| &p.location == location) {
                    Some(slot) => *slot = parsed,
                    None => self.succeeded.push(parsed),
                }
            }
            DocumentParse::Failed(failure) => {
                self.succeeded.retain(|p| &p.location != location);
                self.failed.push(failure);
            }
            DocumentParse::Unsupported => {
                self.succeeded.retain(|p| &p.location != location);
                self.skipped.push(location.clone());
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Nothing to parse. Distinct from a finished batch with no successes.
    NoDocuments,
    Finished(DispatchReport),
}

#[derive(Debug, Clone)]
pub struct ParseDispatcher {
    registry: Arc<ExtractorRegistry>,
}

impl ParseDispatcher {
    pub fn new(registry: Arc<ExtractorRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// Parse every location with at most `concurrency_limit` extractions in flight
    pub fn dispatch(
        &self,
        source: &dyn DocumentSource,
        locations: &[DocumentId],
        concurrency_limit: usize,
    ) -> Result<DispatchOutcome> {
        self.dispatch_with_progress(source, locations, concurrency_limit, |_| {})
    }

    /// Like [`dispatch`](Self::dispatch), reporting progress after each document.
    /// `completed` increases by exactly one per call.
    pub fn dispatch_with_progress<P>(
        &self,
        source: &dyn DocumentSource,
        locations: &[DocumentId],
        concurrency_limit: usize,
        progress: P,
    ) -> Result<DispatchOutcome>
    where
        P: Fn(DispatchProgress) + Sync,
    {
        if locations.is_empty() {
            return Ok(DispatchOutcome::NoDocuments);
        }

        // First occurrence wins
        let mut seen = HashSet::with_capacity(locations.len());
        let unique: Vec<&DocumentId> = locations
            .iter()
            .filter(|location| seen.insert(*location))
            .collect();
        if unique.len() < locations.len() {
            debug!(
                "Collapsed {} duplicate document locations",
                locations.len() - unique.len()
            );
        }

        let threads = concurrency_limit.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("selector-parse-{}", i))
            .build()?;

        let total = unique.len();
        let completed = Mutex::new(0usize);
        let results: Vec<DocumentParse> = pool.install(|| {
            unique
                .par_iter()
                .map(|location| {
                    let result = self.parse_one(source, location);
                    // Count and emit under the lock so observers see 1, 2, 3...
                    let mut done = completed.lock().unwrap_or_else(PoisonError::into_inner);
                    *done += 1;
                    progress(DispatchProgress {
                        completed: *done,
                        total,
                    });
                    result
                })
                .collect()
        });

        let mut report = DispatchReport::default();
        for (location, result) in unique.into_iter().zip(results) {
            match result {
                DocumentParse::Parsed(parsed) => report.succeeded.push(parsed),
                DocumentParse::Failed(failure) => report.failed.push(failure),
                DocumentParse::Unsupported => report.skipped.push(location.clone()),
            }
        }

        debug!(
            "Dispatch finished on {} threads: {} parsed, {} failed, {} skipped",
            threads,
            report.succeeded.len(),
            report.failed.len(),
            report.skipped.len()
        );
        Ok(DispatchOutcome::Finished(report))
    }

    /// Resolve, read and extract a single document
    pub fn parse_one(&self, source: &dyn DocumentSource, location: &DocumentId) -> DocumentParse {
        let Some(kind) = source.document_kind(location) else {
            return DocumentParse::Unsupported;
        };
        let Some(extractor) = self.registry.resolve(&kind) else {
            return DocumentParse::Unsupported;
        };

        let text = match source.read_text(location) {
            Ok(text) => text,
            Err(e) => {
                return DocumentParse::Failed(ParseFailure {
                    location: location.clone(),
                    reason: format!("{:#}", e),
                })
            }
        };

        match panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(&text))) {
            Ok(definitions) => DocumentParse::Parsed(ParsedDocument {
                location: location.clone(),
                kind,
                definitions,
            }),
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                warn!(
                    "Extractor '{}' panicked on {}: {}",
                    extractor.name(),
                    location,
                    reason
                );
                DocumentParse::Failed(ParseFailure {
                    location: location.clone(),
                    reason: format!("extractor '{}' panicked: {}", extractor.name(), reason),
                })
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
